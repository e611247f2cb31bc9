//! Frame sampling and text extraction on top of ffmpeg and tesseract.

pub mod annotate;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod sampler;
pub mod sink;
pub mod video;

pub use error::{ExtractError, OcrError};
