use std::path::PathBuf;

use thiserror::Error;

/// Failures of a frame extraction run.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The video path is missing or is not a readable video container.
    #[error("video source unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The container reported a frame rate the interval cannot be derived from.
    #[error("invalid capture rate reported by source: {fps} fps")]
    InvalidCaptureRate { fps: f64 },

    #[error("frames per minute must be a positive number, got {0}")]
    InvalidOutputRate(f64),

    #[error("decoding failed at frame {frame}: {reason}")]
    Decode { frame: u64, reason: String },

    #[error("failed to create output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write frame to {}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Failures of a text extraction run.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("could not read image {}", path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to run tesseract, is it installed?")]
    EngineUnavailable(#[source] std::io::Error),

    #[error("tesseract exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },
}
