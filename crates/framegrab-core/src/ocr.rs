use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, error, info};

use crate::error::OcrError;

/// Parameters for a text extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
        }
    }
}

/// Extract text from an image file with the tesseract CLI.
pub fn extract_text(path: &Path, config: &OcrConfig) -> Result<String, OcrError> {
    if !path.is_file() {
        return Err(OcrError::ImageNotFound(path.to_path_buf()));
    }

    // Corrupt or unsupported files surface as UnreadableImage, not as a tesseract error.
    let image = image::open(path).map_err(|source| OcrError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        ?path,
        width = image.width(),
        height = image.height(),
        lang = %config.lang,
        "running tesseract"
    );

    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(&config.lang)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(OcrError::EngineUnavailable)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(%stderr, ?path, "tesseract failed");
        return Err(OcrError::EngineFailed {
            status: output.status.to_string(),
            stderr,
        });
    }

    let text = clean_output(&String::from_utf8_lossy(&output.stdout));
    debug!(chars = text.len(), "tesseract completed");
    Ok(text)
}

/// Drop page-break form feeds, trailing spaces, and blank lines at either end.
fn clean_output(raw: &str) -> String {
    let raw = raw.replace('\u{c}', "");
    let lines: Vec<&str> = raw
        .split('\n')
        .map(str::trim_end)
        .collect();

    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
