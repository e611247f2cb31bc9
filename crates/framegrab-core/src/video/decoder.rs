use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::FrameSource;
use crate::error::ExtractError;

/// Video metadata obtained by probing with ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count from the container, 0 when the container does not store one.
    pub frame_count: u64,
}

/// Locations of the ffprobe and ffmpeg executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegTools {
    /// Both looked up on `PATH`.
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

fn probe(path: &Path, ffprobe: &Path) -> Result<VideoInfo> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate,nb_frames",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&stdout)?;

    if info.fps <= 0.0 {
        warn!(fps = info.fps, ?path, "video reports non-positive fps");
    }

    info!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        frame_count = info.frame_count,
        "probe completed"
    );
    Ok(info)
}

/// Parse ffprobe csv output of the form `width,height,num/den[,nb_frames]`.
fn parse_probe_output(stdout: &str) -> Result<VideoInfo> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .context("ffprobe reported no video stream")?;

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        error!(%line, "unexpected ffprobe output format, expected width,height,fps");
        bail!("unexpected ffprobe output: {line}");
    }

    let width: u32 = parts[0].parse().context("failed to parse width")?;
    let height: u32 = parts[1].parse().context("failed to parse height")?;
    let fps = parse_frame_rate(parts[2])?;

    // Containers without a frame index (mkv, some streams) report N/A.
    let frame_count = parts
        .get(3)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

fn parse_frame_rate(s: &str) -> Result<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().context("failed to parse fps numerator")?;
        let den: f64 = den.parse().context("failed to parse fps denominator")?;
        Ok(if den > 0.0 { num / den } else { 0.0 })
    } else {
        s.parse().context("failed to parse fps")
    }
}

/// Collect everything ffmpeg writes to stderr so the pipe never fills up.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
pub struct VideoDecoder {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    path: PathBuf,
    info: VideoInfo,
    frames_read: u64,
    frame_bytes: usize,
}

impl VideoDecoder {
    /// Open a video file for decoding with ffprobe/ffmpeg from `PATH`.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        Self::open_with(path, &FfmpegTools::default())
    }

    pub fn open_with(path: &Path, tools: &FfmpegTools) -> Result<Self, ExtractError> {
        let unavailable = |reason: String| ExtractError::SourceUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file does not exist".into()));
        }

        let info = probe(path, &tools.ffprobe).map_err(|e| unavailable(format!("{e:#}")))?;
        if info.width == 0 || info.height == 0 {
            return Err(unavailable(format!(
                "invalid video dimensions: {}x{}",
                info.width, info.height
            )));
        }

        info!(?path, ffmpeg = ?tools.ffmpeg, "spawning ffmpeg decoder process");

        // Probed dimensions are the coded ones; autorotation would transpose them.
        let mut child = Command::new(&tools.ffmpeg)
            .args(["-noautorotate", "-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to spawn ffmpeg, is it installed? {e}")))?;

        let stderr = child.stderr.take().map(drain_stderr);
        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            child,
            stderr,
            path: path.to_path_buf(),
            info,
            frames_read: 0,
            frame_bytes,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Reap ffmpeg once its stdout is exhausted; a failed exit becomes an error.
    fn finish(&mut self) -> Result<(), ExtractError> {
        let frame = self.frames_read;
        let status = self.child.wait().map_err(|e| ExtractError::Decode {
            frame,
            reason: format!("failed to wait for ffmpeg: {e}"),
        })?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if status.success() {
            if !stderr.is_empty() {
                warn!(%stderr, "ffmpeg reported errors but exited cleanly");
            }
            return Ok(());
        }

        error!(%status, %stderr, frame, "ffmpeg exited with failure");
        let reason = format!("ffmpeg exited with {status}: {stderr}");
        if frame == 0 {
            Err(ExtractError::SourceUnavailable {
                path: self.path.clone(),
                reason,
            })
        } else {
            Err(ExtractError::Decode { frame, reason })
        }
    }
}

impl FrameSource for VideoDecoder {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    /// Read the next frame from the ffmpeg pipe, or `None` if the video is finished.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, ExtractError> {
        let frame = self.frames_read;
        let stdout = self
            .child
            .stdout
            .as_mut()
            .ok_or_else(|| ExtractError::Decode {
                frame,
                reason: "ffmpeg stdout not available".into(),
            })?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!(frame, %e, "failed to read from ffmpeg pipe");
                    return Err(ExtractError::Decode {
                        frame,
                        reason: format!("failed to read from ffmpeg pipe: {e}"),
                    });
                }
            }
        }

        if read < self.frame_bytes {
            // Close our end first so ffmpeg can't block on a full pipe while we wait.
            self.child.stdout = None;
            self.finish()?;

            if read == 0 {
                info!(total_frames = self.frames_read, "video stream ended");
                return Ok(None);
            }
            error!(
                read_bytes = read,
                expected_bytes = self.frame_bytes,
                frame,
                "ffmpeg stream ended mid-frame"
            );
            return Err(ExtractError::Decode {
                frame,
                reason: format!(
                    "stream ended mid-frame (read {read}/{} bytes)",
                    self.frame_bytes
                ),
            });
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf).ok_or_else(|| {
            ExtractError::Decode {
                frame,
                reason: "raw frame does not match video dimensions".into(),
            }
        })?;
        self.frames_read += 1;

        debug!(frame, "decoded frame");
        Ok(Some(image))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(total_frames = self.frames_read, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    /// Tests that write and then execute stub tools hold this, so no other
    /// test forks while a script is still open for writing (ETXTBSY).
    static STUB_TOOLS: Mutex<()> = Mutex::new(());

    pub(crate) fn stub_lock() -> MutexGuard<'static, ()> {
        STUB_TOOLS.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write executable `ffprobe`/`ffmpeg` shell scripts into `dir`.
    #[cfg(unix)]
    pub(crate) fn stub_tools(dir: &Path, ffprobe_body: &str, ffmpeg_body: &str) -> FfmpegTools {
        use std::os::unix::fs::PermissionsExt;

        let write_script = |name: &str, body: &str| {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };

        FfmpegTools {
            ffprobe: write_script("ffprobe", ffprobe_body),
            ffmpeg: write_script("ffmpeg", ffmpeg_body),
        }
    }

    /// A 2x2 video at 30 fps claiming 3 frames: 12 bytes per RGB frame.
    #[cfg(unix)]
    pub(crate) const TINY_PROBE: &str = "echo 2,2,30/1,3";

    #[cfg(unix)]
    fn open_stub(ffmpeg_body: &str) -> (tempfile::TempDir, Result<VideoDecoder, ExtractError>) {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"container").unwrap();
        let tools = stub_tools(dir.path(), TINY_PROBE, ffmpeg_body);
        let decoder = VideoDecoder::open_with(&video, &tools);
        (dir, decoder)
    }

    #[cfg(unix)]
    fn drain(decoder: &mut VideoDecoder) -> (u64, Result<(), ExtractError>) {
        let mut frames = 0;
        loop {
            match decoder.next_frame() {
                Ok(Some(_)) => frames += 1,
                Ok(None) => return (frames, Ok(())),
                Err(e) => return (frames, Err(e)),
            }
        }
    }

    #[test]
    fn parses_rational_frame_rate_and_count() {
        let info = parse_probe_output("1920,1080,30000/1001,1798\n").unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.frame_count, 1798);
    }

    #[test]
    fn unknown_frame_count_is_zero() {
        let info = parse_probe_output("640,360,25/1,N/A").unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.frame_count, 0);

        let info = parse_probe_output("640,360,25/1").unwrap();
        assert_eq!(info.frame_count, 0);
    }

    #[test]
    fn zero_denominator_yields_zero_fps() {
        let info = parse_probe_output("640,360,0/0,10").unwrap();
        assert_eq!(info.fps, 0.0);
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("640,360").is_err());
        assert!(parse_probe_output("wide,360,25/1").is_err());
    }

    #[test]
    fn open_missing_file_is_source_unavailable() {
        let err = VideoDecoder::open(Path::new("/definitely/not/here.mp4"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, ExtractError::SourceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn reads_every_frame_then_ends() {
        let _guard = stub_lock();
        let (_dir, decoder) = open_stub("head -c 36 /dev/zero");
        let mut decoder = decoder.unwrap();

        let (frames, result) = drain(&mut decoder);
        assert!(result.is_ok());
        assert_eq!(frames, 3);
        assert_eq!(decoder.info().frame_count, 3);
    }

    #[cfg(unix)]
    #[test]
    fn ffmpeg_failure_before_first_frame_is_source_unavailable() {
        let _guard = stub_lock();
        let (_dir, decoder) = open_stub("echo 'Decoder not found' >&2; exit 1");
        let mut decoder = decoder.unwrap();

        let (frames, result) = drain(&mut decoder);
        assert_eq!(frames, 0);
        match result {
            Err(ExtractError::SourceUnavailable { reason, .. }) => {
                assert!(reason.contains("Decoder not found"), "reason: {reason}");
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn ffmpeg_failure_mid_stream_is_decode_error() {
        let _guard = stub_lock();
        let (_dir, decoder) =
            open_stub("head -c 24 /dev/zero; echo 'corrupt packet' >&2; exit 1");
        let mut decoder = decoder.unwrap();

        let (frames, result) = drain(&mut decoder);
        assert_eq!(frames, 2);
        match result {
            Err(ExtractError::Decode { frame, reason }) => {
                assert_eq!(frame, 2);
                assert!(reason.contains("corrupt packet"), "reason: {reason}");
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn truncated_frame_is_decode_error() {
        let _guard = stub_lock();
        let (_dir, decoder) = open_stub("head -c 30 /dev/zero");
        let mut decoder = decoder.unwrap();

        let (frames, result) = drain(&mut decoder);
        assert_eq!(frames, 2);
        match result {
            Err(ExtractError::Decode { frame, reason }) => {
                assert_eq!(frame, 2);
                assert!(reason.contains("read 6/12 bytes"), "reason: {reason}");
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn ffmpeg_is_told_not_to_autorotate() {
        let _guard = stub_lock();
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args.txt");
        let (_stub_dir, decoder) = open_stub(&format!(
            "echo \"$@\" > '{}'; head -c 12 /dev/zero",
            args_file.display()
        ));
        let mut decoder = decoder.unwrap();
        let (frames, result) = drain(&mut decoder);
        assert!(result.is_ok());
        assert_eq!(frames, 1);

        let args = std::fs::read_to_string(&args_file).unwrap();
        assert!(args.starts_with("-noautorotate -i "), "ffmpeg args: {args}");
    }

    #[cfg(unix)]
    #[test]
    fn failing_probe_is_source_unavailable() {
        let _guard = stub_lock();
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not a container").unwrap();
        let tools = stub_tools(
            dir.path(),
            "echo 'Invalid data found when processing input' >&2; exit 1",
            "exit 0",
        );

        match VideoDecoder::open_with(&video, &tools) {
            Err(ExtractError::SourceUnavailable { reason, .. }) => {
                assert!(reason.contains("Invalid data"), "reason: {reason}");
            }
            Err(other) => panic!("expected SourceUnavailable, got {other:?}"),
            Ok(_) => panic!("expected open to fail"),
        }
    }
}
