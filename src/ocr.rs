use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("could not run OCR engine: {0}")]
    Spawn(String),
    #[error("OCR engine failed: {0}")]
    Engine(String),
}

/// Image → text. An empty string is a successful "nothing found".
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` command line tool, feeding the image on stdin.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
    lang: Option<String>,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            program: "tesseract".into(),
            lang: None,
        }
    }
}

impl TesseractRecognizer {
    pub fn new(program: impl Into<String>, lang: Option<String>) -> Self {
        Self {
            program: program.into(),
            lang,
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("stdin").arg("stdout");
        if let Some(lang) = &self.lang {
            cmd.arg("-l").arg(lang);
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Spawn(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        if !output.status.success() {
            return Err(OcrError::Engine(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(normalize_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Trim each line and drop blank ones, keeping one recognised line per row.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_blank_lines() {
        // tesseract ends its output with a form feed
        assert_eq!(normalize_text("  a \n\n\x0c\n b\n"), "a\nb");
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let r = TesseractRecognizer::new("definitely-not-a-real-ocr-binary", None);
        assert!(matches!(r.recognize(b"png"), Err(OcrError::Spawn(_))));
    }
}
