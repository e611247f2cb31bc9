pub mod decoder;
pub mod frame;

use image::RgbImage;

use crate::error::ExtractError;

/// A sequential, single-pass source of decoded frames.
///
/// Frames carry no index of their own: the consumer numbers them by arrival order.
pub trait FrameSource {
    /// Nominal capture rate in frames per second, as reported by the container.
    fn fps(&self) -> f64;

    /// Total frame count reported by the container, or 0 if unknown.
    fn frame_count(&self) -> u64;

    /// Pull the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, ExtractError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn frame_count(&self) -> u64 {
        (**self).frame_count()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, ExtractError> {
        (**self).next_frame()
    }
}
