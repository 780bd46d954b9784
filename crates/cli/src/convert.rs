//! HEIC/HEIF conversion through ImageMagick.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use zoom_enhance_core::services::FormatConverter;
use zoom_enhance_core::{AppError, Result};

/// Pipes the file through `magick heic:- png:-`.
pub struct MagickConverter {
    program: String,
}

impl MagickConverter {
    pub fn new() -> Self {
        Self {
            program: std::env::var("ZOOM_ENHANCE_MAGICK").unwrap_or_else(|_| "magick".to_string()),
        }
    }
}

impl Default for MagickConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatConverter for MagickConverter {
    async fn convert(&self, bytes: Vec<u8>, declared_type: &str) -> Result<Vec<u8>> {
        debug!(
            program = %self.program,
            declared_type,
            bytes = bytes.len(),
            "converting via ImageMagick"
        );

        let mut child = Command::new(&self.program)
            .args(["heic:-", "png:-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::conversion(format!("failed to start {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::conversion("converter stdin unavailable"))?;
        // Feed stdin concurrently so a full stdout pipe cannot stall the child
        let writer = tokio::spawn(async move { stdin.write_all(&bytes).await });

        let output = child.wait_with_output().await?;
        writer
            .await
            .map_err(|e| AppError::conversion(format!("converter input task failed: {}", e)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(AppError::conversion("converter produced no output"));
        }
        Ok(output.stdout)
    }
}
