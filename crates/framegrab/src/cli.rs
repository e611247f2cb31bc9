use std::path::PathBuf;

use clap::{Parser, Subcommand};

use framegrab_core::pipeline::DEFAULT_OUTPUT_DIR;
use framegrab_core::sampler::DEFAULT_FRAMES_PER_MINUTE;

#[derive(Parser)]
#[command(
    name = "framegrab",
    about = "Sample still frames from videos and read text from images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract frames from a video at a fixed number of frames per minute.
    Extract {
        /// Path to the input video file (MP4, MKV, etc.).
        video: PathBuf,

        /// Number of frames to extract per minute of video.
        #[arg(default_value_t = DEFAULT_FRAMES_PER_MINUTE, value_parser = parse_frames_per_minute)]
        frames_per_minute: f64,

        /// Directory to save the extracted frames to.
        #[arg(default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Stamp each frame with its sequence number and timestamp, using this TTF/OTF font.
        #[arg(long)]
        annotate_font: Option<PathBuf>,

        /// Write a protobuf summary of the run to this file.
        #[arg(long)]
        summary: Option<PathBuf>,

        /// ffmpeg executable to decode with.
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,

        /// ffprobe executable to read video metadata with.
        #[arg(long, default_value = "ffprobe")]
        ffprobe: PathBuf,
    },

    /// Extract text from an image with tesseract.
    Ocr {
        /// Path to the image file.
        image: PathBuf,

        /// Tesseract language code(s), e.g. "eng" or "eng+deu".
        #[arg(short, long, default_value = "eng")]
        lang: String,
    },
}

fn parse_frames_per_minute(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("must be a positive number, got {s}"))
    }
}
