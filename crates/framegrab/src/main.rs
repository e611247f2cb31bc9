mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use prost::Message;
use tracing::{info, warn};

use framegrab_core::ocr::{self, OcrConfig};
use framegrab_core::pipeline::{self, ExtractConfig};
use framegrab_core::sampler::SamplingPolicy;
use framegrab_core::video::decoder::FfmpegTools;
use framegrab_proto::proto::ExtractionSummary;

const OCR_RULE_WIDTH: usize = 60;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Extract {
            video,
            frames_per_minute,
            output_dir,
            annotate_font,
            summary,
            ffmpeg,
            ffprobe,
        } => {
            info!(?video, frames_per_minute, ?output_dir, "starting extraction");

            let config = ExtractConfig {
                sampling: SamplingPolicy { frames_per_minute },
                output_dir,
                annotate_font,
                record_frames: summary.is_some(),
                tools: FfmpegTools { ffprobe, ffmpeg },
            };

            let result = pipeline::run_extraction(&video, &config)
                .with_context(|| format!("frame extraction failed for {}", video.display()))?;

            if result.frames_extracted == 0 {
                warn!("no frames extracted, the video contained no decodable frames");
            }

            if let Some(path) = summary {
                write_summary(&result, &path)?;
            }

            info!(
                frames_extracted = result.frames_extracted,
                output_dir = %result.output_dir,
                "done"
            );
            Ok(())
        }
        cli::Command::Ocr { image, lang } => {
            let config = OcrConfig { lang };
            let text = ocr::extract_text(&image, &config)
                .with_context(|| format!("text extraction failed for {}", image.display()))?;

            let rule = "=".repeat(OCR_RULE_WIDTH);
            println!("Extracting text from: {}", image.display());
            println!("{rule}");
            println!("{text}");
            println!("{rule}");
            Ok(())
        }
    }
}

/// Serialize the run summary as a length-delimited protobuf message and write it to file.
fn write_summary(summary: &ExtractionSummary, output: &Path) -> Result<()> {
    info!(?output, "writing protobuf summary");

    let mut buf = Vec::new();
    summary
        .encode_length_delimited(&mut buf)
        .context("failed to encode ExtractionSummary")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).context("failed to create summary directory")?;
    }

    std::fs::write(output, &buf)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(?output, bytes = buf.len(), "protobuf summary written");
    Ok(())
}
