use image::RgbImage;

/// A frame chosen by the sampler for output.
pub struct SelectedFrame {
    /// The frame's image data.
    pub image: RgbImage,
    /// 0-based counter of selected frames.
    pub sequence: u64,
    /// Index of the frame in the source (0-based, by arrival order).
    pub frame_index: u64,
    /// Elapsed seconds from the start of the source.
    pub timestamp_seconds: f64,
}

impl SelectedFrame {
    /// Zero-padded sequence number plus timestamp, e.g. `0002_t24.00s`.
    pub fn label(&self) -> String {
        format!("{:04}_t{:.2}s", self.sequence, self.timestamp_seconds)
    }

    /// Output file name for a source whose file stem is `stem`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}_frame_{}.jpg", self.label())
    }
}
