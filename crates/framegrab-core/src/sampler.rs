use std::iter::FusedIterator;

use tracing::{debug, info};

use crate::error::ExtractError;
use crate::video::frame::SelectedFrame;
use crate::video::FrameSource;

/// Frames extracted per minute of video when the caller does not say otherwise.
pub const DEFAULT_FRAMES_PER_MINUTE: f64 = 5.0;

/// How densely to sample a video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    /// Desired output rate, in selected frames per minute of video.
    pub frames_per_minute: f64,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            frames_per_minute: DEFAULT_FRAMES_PER_MINUTE,
        }
    }
}

/// Number of source frames between two selections.
///
/// `round(capture_rate / (frames_per_minute / 60))`, rounding half away from zero,
/// never less than 1.
pub fn frame_interval(capture_rate: f64, frames_per_minute: f64) -> Result<u64, ExtractError> {
    if !(capture_rate.is_finite() && capture_rate > 0.0) {
        return Err(ExtractError::InvalidCaptureRate { fps: capture_rate });
    }
    if !(frames_per_minute.is_finite() && frames_per_minute > 0.0) {
        return Err(ExtractError::InvalidOutputRate(frames_per_minute));
    }

    let interval = (capture_rate / (frames_per_minute / 60.0)).round();
    Ok((interval as u64).max(1))
}

/// Lazily selects every `interval`-th frame of a [`FrameSource`].
///
/// Holds at most one decoded frame at a time. Once the source is exhausted, or
/// has returned an error, the sampler yields nothing further.
pub struct FrameSampler<S> {
    source: S,
    capture_rate: f64,
    interval: u64,
    frames_pulled: u64,
    frames_selected: u64,
    finished: bool,
}

impl<S: FrameSource> FrameSampler<S> {
    /// Derive the frame interval from the source's capture rate.
    ///
    /// Fails before any frame is pulled if the rate is unusable.
    pub fn new(source: S, policy: &SamplingPolicy) -> Result<Self, ExtractError> {
        let capture_rate = source.fps();
        let interval = frame_interval(capture_rate, policy.frames_per_minute)?;

        info!(
            capture_rate,
            frames_per_minute = policy.frames_per_minute,
            interval,
            "frame sampler ready"
        );

        Ok(Self {
            source,
            capture_rate,
            interval,
            frames_pulled: 0,
            frames_selected: 0,
            finished: false,
        })
    }

    pub fn frame_interval(&self) -> u64 {
        self.interval
    }

    pub fn capture_rate(&self) -> f64 {
        self.capture_rate
    }

    /// Frames pulled from the source so far, selected or not.
    pub fn frames_pulled(&self) -> u64 {
        self.frames_pulled
    }

    pub fn frames_selected(&self) -> u64 {
        self.frames_selected
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> Iterator for FrameSampler<S> {
    type Item = Result<SelectedFrame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let image = match self.source.next_frame() {
                Ok(Some(image)) => image,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            let frame_index = self.frames_pulled;
            self.frames_pulled += 1;

            if frame_index % self.interval != 0 {
                continue;
            }

            let sequence = self.frames_selected;
            self.frames_selected += 1;
            let timestamp_seconds = frame_index as f64 / self.capture_rate;

            debug!(sequence, frame_index, timestamp_seconds, "selected frame");

            return Some(Ok(SelectedFrame {
                image,
                sequence,
                frame_index,
                timestamp_seconds,
            }));
        }
        None
    }
}

impl<S: FrameSource> FusedIterator for FrameSampler<S> {}
