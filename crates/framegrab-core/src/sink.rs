use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::annotate::FrameAnnotator;
use crate::error::ExtractError;
use crate::video::frame::SelectedFrame;

/// Destination for selected frames.
pub trait FrameSink {
    /// Persist one frame, returning where it was written.
    fn write(&mut self, frame: &SelectedFrame) -> Result<PathBuf, ExtractError>;
}

/// Writes frames as JPEG files named `<stem>_frame_<seq>_t<secs>s.jpg` into one directory.
pub struct DirectorySink {
    dir: PathBuf,
    stem: String,
    annotator: Option<FrameAnnotator>,
}

impl DirectorySink {
    /// Create `dir` (and its parents) if needed.
    pub fn create(
        dir: &Path,
        stem: impl Into<String>,
        annotator: Option<FrameAnnotator>,
    ) -> Result<Self, ExtractError> {
        std::fs::create_dir_all(dir).map_err(|source| ExtractError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
        info!(?dir, annotate = annotator.is_some(), "output directory ready");

        Ok(Self {
            dir: dir.to_path_buf(),
            stem: stem.into(),
            annotator,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for DirectorySink {
    fn write(&mut self, frame: &SelectedFrame) -> Result<PathBuf, ExtractError> {
        let path = self.dir.join(frame.file_name(&self.stem));

        let saved = match &self.annotator {
            Some(annotator) => annotator.annotate(frame).save(&path),
            None => frame.image.save(&path),
        };
        saved.map_err(|source| ExtractError::Persist {
            path: path.clone(),
            source,
        })?;

        debug!(?path, sequence = frame.sequence, "saved frame");
        Ok(path)
    }
}

/// File stem of the source video, used as the base of every output file name.
pub fn source_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn frame(sequence: u64, timestamp_seconds: f64) -> SelectedFrame {
        SelectedFrame {
            image: RgbImage::from_pixel(8, 8, Rgb([200, 30, 30])),
            sequence,
            frame_index: sequence * 10,
            timestamp_seconds,
        }
    }

    #[test]
    fn writes_named_jpeg_into_created_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/frames");
        let mut sink = DirectorySink::create(&dir, "clip", None).unwrap();

        let path = sink.write(&frame(3, 12.5)).unwrap();

        assert_eq!(path, dir.join("clip_frame_0003_t12.50s.jpg"));
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn uncreatable_directory_is_output_dir_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = DirectorySink::create(&blocker.join("frames"), "clip", None)
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::OutputDir { .. }));
    }

    #[test]
    fn write_into_removed_directory_is_persist_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("frames");
        let mut sink = DirectorySink::create(&dir, "clip", None).unwrap();
        std::fs::remove_dir(&dir).unwrap();

        let err = sink.write(&frame(0, 0.0)).unwrap_err();
        assert!(matches!(err, ExtractError::Persist { .. }));
    }

    #[test]
    fn stem_comes_from_file_name() {
        assert_eq!(source_stem(Path::new("/videos/talk.final.mp4")), "talk.final");
        assert_eq!(source_stem(Path::new("/")), "video");
    }
}
