use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Shells out to the `tesseract` binary for scanned resumes.
#[derive(Clone)]
pub struct TesseractCliOcrService {
    pub tesseract_executable_path: String,
    pub timeout: Duration,
}

impl TesseractCliOcrService {
    pub fn new(tesseract_executable_path: String, timeout: Duration) -> Self {
        Self {
            tesseract_executable_path,
            timeout,
        }
    }

    /// Returns an empty string when OCR is unavailable or gives up; the caller
    /// reports the missing text rather than failing the whole batch.
    pub async fn extract_text(&self, pdf_bytes: &[u8]) -> anyhow::Result<String> {
        if self.tesseract_executable_path.trim().is_empty() {
            warn!("OCR requested but no tesseract path is configured");
            return Ok(String::new());
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("hireai-ocr-")
            .tempdir()
            .context("failed to create OCR temp dir")?;

        let input_path = temp_dir.path().join("resume.pdf");
        tokio::fs::write(&input_path, pdf_bytes)
            .await
            .context("failed to stage resume for OCR")?;

        let mut command = Command::new(&self.tesseract_executable_path);
        command
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %self.tesseract_executable_path, "tesseract binary not found");
                return Ok(String::new());
            }
            Ok(Err(err)) => return Err(err).context("failed to run tesseract"),
            Err(_) => {
                warn!(seconds = self.timeout.as_secs(), "tesseract timed out");
                return Ok(String::new());
            }
        };

        if !output.status.success() {
            warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "tesseract exited with an error"
            );
            return Ok(String::new());
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        debug!(chars = text.len(), "OCR finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_path_disables_ocr() {
        let ocr = TesseractCliOcrService::new(String::new(), Duration::from_secs(1));
        assert_eq!(ocr.extract_text(b"%PDF-1.4").await.unwrap(), "");
    }

    #[tokio::test]
    async fn missing_binary_yields_empty_text() {
        let ocr = TesseractCliOcrService::new(
            "/nonexistent/hireai/tesseract".to_string(),
            Duration::from_secs(1),
        );
        assert_eq!(ocr.extract_text(b"%PDF-1.4").await.unwrap(), "");
    }
}
