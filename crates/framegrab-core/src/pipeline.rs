use std::path::{Path, PathBuf};

use tracing::info;

use framegrab_proto::proto::{ExtractedFrame, ExtractionSummary};

use crate::annotate::FrameAnnotator;
use crate::error::ExtractError;
use crate::sampler::{FrameSampler, SamplingPolicy};
use crate::sink::{source_stem, DirectorySink, FrameSink};
use crate::video::decoder::{FfmpegTools, VideoDecoder, VideoInfo};
use crate::video::FrameSource;

/// Where frames go when no output directory is given.
pub const DEFAULT_OUTPUT_DIR: &str = "./extracted_frames";

/// Log a progress line after every this many extracted frames.
const PROGRESS_EVERY: u64 = 10;

/// Parameters for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub sampling: SamplingPolicy,
    /// Directory the selected frames are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Font used to stamp each frame with its label, or None to write frames untouched.
    pub annotate_font: Option<PathBuf>,
    /// Keep one record per written frame in the summary. Off, memory stays flat
    /// regardless of video length.
    pub record_frames: bool,
    pub tools: FfmpegTools,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingPolicy::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            annotate_font: None,
            record_frames: true,
            tools: FfmpegTools::default(),
        }
    }
}

/// Extract frames from a video file into `config.output_dir`.
///
/// Fails with [`ExtractError::SourceUnavailable`] before touching the output
/// directory if the video is missing or unreadable, and with
/// [`ExtractError::InvalidCaptureRate`] if its frame rate is unusable.
pub fn run_extraction(
    input: &Path,
    config: &ExtractConfig,
) -> Result<ExtractionSummary, ExtractError> {
    if !input.exists() {
        return Err(ExtractError::SourceUnavailable {
            path: input.to_path_buf(),
            reason: "file does not exist".into(),
        });
    }

    info!(
        ?input,
        output_dir = ?config.output_dir,
        frames_per_minute = config.sampling.frames_per_minute,
        "extraction starting"
    );

    let mut decoder = VideoDecoder::open_with(input, &config.tools)?;
    log_video_properties(&decoder.info());

    let sampler = FrameSampler::new(&mut decoder, &config.sampling)?;

    let annotator = config
        .annotate_font
        .as_deref()
        .and_then(FrameAnnotator::load);
    let mut sink = DirectorySink::create(&config.output_dir, source_stem(input), annotator)?;

    let mut summary = drain(sampler, &config.sampling, config.record_frames, &mut sink)?;
    summary.video_path = input.to_string_lossy().into_owned();
    summary.output_dir = config.output_dir.to_string_lossy().into_owned();

    info!(
        frames_extracted = summary.frames_extracted,
        output_dir = ?config.output_dir,
        "extraction complete"
    );
    Ok(summary)
}

/// Sample `source` according to `policy` and hand every selected frame to `sink`.
///
/// The returned summary leaves `video_path` and `output_dir` empty. Its
/// `frames` list is only filled when `record_frames` is set.
pub fn extract<S: FrameSource, W: FrameSink>(
    source: S,
    policy: &SamplingPolicy,
    record_frames: bool,
    sink: &mut W,
) -> Result<ExtractionSummary, ExtractError> {
    let sampler = FrameSampler::new(source, policy)?;
    drain(sampler, policy, record_frames, sink)
}

fn drain<S: FrameSource, W: FrameSink>(
    mut sampler: FrameSampler<S>,
    policy: &SamplingPolicy,
    record_frames: bool,
    sink: &mut W,
) -> Result<ExtractionSummary, ExtractError> {
    let fps = sampler.capture_rate();
    let interval = sampler.frame_interval();
    let total_frames = sampler.source().frame_count();

    info!(
        interval,
        seconds_between = 60.0 / policy.frames_per_minute,
        "extracting 1 frame every {interval} frames"
    );

    let mut frames: Vec<ExtractedFrame> = Vec::new();
    let mut extracted: u64 = 0;
    for selected in &mut sampler {
        let frame = selected?;
        let path = sink.write(&frame)?;
        extracted += 1;

        if record_frames {
            frames.push(ExtractedFrame {
                sequence: frame.sequence,
                frame_index: frame.frame_index,
                timestamp_seconds: frame.timestamp_seconds,
                path: path.to_string_lossy().into_owned(),
            });
        }

        if extracted % PROGRESS_EVERY == 0 {
            info!(extracted, "extraction progress");
        }
    }

    let frames_decoded = sampler.frames_pulled();
    info!(
        frames_decoded,
        frames_extracted = extracted,
        "frame sampling finished"
    );

    Ok(ExtractionSummary {
        video_path: String::new(),
        output_dir: String::new(),
        fps,
        duration_seconds: duration_seconds(total_frames, fps),
        total_frames,
        frames_decoded,
        frames_extracted: extracted,
        frames_per_minute: policy.frames_per_minute,
        frame_interval: interval,
        frames,
    })
}

fn duration_seconds(total_frames: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        total_frames as f64 / fps
    } else {
        0.0
    }
}

fn log_video_properties(info: &VideoInfo) {
    let duration = duration_seconds(info.frame_count, info.fps);
    info!(
        fps = info.fps,
        total_frames = info.frame_count,
        duration_seconds = duration,
        duration_minutes = duration / 60.0,
        width = info.width,
        height = info.height,
        "video properties"
    );
}
