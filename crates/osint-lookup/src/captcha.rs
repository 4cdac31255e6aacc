//! CAPTCHA solving.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::LookupError;

/// Length of the answers the titles portal accepts.
pub const ANSWER_LEN: usize = 4;

const WHITELIST: &str = "tessedit_char_whitelist=0123456789abcdefghijklmnopqrstuvwxyz";

/// Turns a CAPTCHA image into its text.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Read the characters shown in `image` (PNG, JPEG or GIF bytes).
    async fn solve(&self, image: &[u8]) -> Result<String, LookupError>;
}

/// Whether `answer` can be a valid CAPTCHA answer: exactly
/// [`ANSWER_LEN`] ASCII letters or digits.
pub fn is_plausible(answer: &str) -> bool {
    answer.len() == ANSWER_LEN && answer.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Solver backed by the `tesseract` OCR command in single-line mode.
#[derive(Debug, Clone)]
pub struct TesseractSolver {
    command: String,
}

impl TesseractSolver {
    /// Use the executable named or located at `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl CaptchaSolver for TesseractSolver {
    async fn solve(&self, image: &[u8]) -> Result<String, LookupError> {
        let file = tempfile::Builder::new()
            .prefix("captcha-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| LookupError::Captcha(format!("temporary file: {e}")))?;
        tokio::fs::write(file.path(), image)
            .await
            .map_err(|e| LookupError::Captcha(format!("writing image: {e}")))?;

        let output = Command::new(&self.command)
            .arg(file.path())
            .arg("stdout")
            .args(["--psm", "7", "-c", WHITELIST])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LookupError::Captcha(format!("running {}: {e}", self.command)))?;

        if !output.status.success() {
            return Err(LookupError::Captcha(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(answer = %answer, "captcha read");
        Ok(answer)
    }
}
