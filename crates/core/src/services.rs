//! Contracts of the external collaborators.
//!
//! The orchestrator only talks to these traits. [`crate::gemini::GeminiClient`]
//! implements the three model-backed ones; tests use in-process fakes.

use crate::error::{AppError, Result};
use crate::history::ImageDescription;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// The three quality dials, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dials {
    pub sharpness: u8,
    pub denoise: u8,
    pub imagination: u8,
}

impl Default for Dials {
    fn default() -> Self {
        Self {
            sharpness: 50,
            denoise: 50,
            imagination: 50,
        }
    }
}

impl Dials {
    /// Builds dials, clamping each value to `[0, 100]`.
    pub fn new(sharpness: u32, denoise: u32, imagination: u32) -> Self {
        Self {
            sharpness: sharpness.min(100) as u8,
            denoise: denoise.min(100) as u8,
            imagination: imagination.min(100) as u8,
        }
    }

    /// Parses the advisor's JSON answer.
    ///
    /// Every field must be present and numeric; fractional values are rounded
    /// and out-of-range values clamped.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let field = |name: &str| -> Result<u32> {
            let n = value
                .get(name)
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| {
                    AppError::malformed(format!("advisor response is missing numeric `{name}`"))
                })?;
            Ok(n.round().clamp(0.0, 100.0) as u32)
        };
        Ok(Self::new(field("sharpness")?, field("denoise")?, field("imagination")?))
    }
}

/// One call to the enhancement backend.
#[derive(Debug, Clone)]
pub struct EnhancementRequest {
    pub image: DynamicImage,
    pub prompt_history: Vec<String>,
    pub seek_easter_egg: bool,
    pub dials: Dials,
}

/// Raw answer of the enhancement backend. The bytes are decoded by the caller.
#[derive(Debug, Clone)]
pub struct EnhancementOutput {
    pub image_bytes: Vec<u8>,
    pub found_easter_egg: bool,
}

/// Turns a selection into a description and a generation prompt.
pub trait DescriptionService {
    fn describe(
        &self,
        image: &DynamicImage,
        prior: &[ImageDescription],
        is_full_image: bool,
    ) -> impl Future<Output = Result<ImageDescription>> + Send;
}

/// Produces the enhanced image.
pub trait EnhancementService {
    fn enhance(
        &self,
        request: EnhancementRequest,
    ) -> impl Future<Output = Result<EnhancementOutput>> + Send;
}

/// Suggests dials for a full image.
pub trait SettingsAdvisor {
    fn recommend(&self, image: &DynamicImage) -> impl Future<Output = Result<Dials>> + Send;
}

/// Converts formats `image` cannot decode (HEIC/HEIF) into PNG bytes.
pub trait FormatConverter {
    fn convert(
        &self,
        bytes: Vec<u8>,
        declared_type: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// True for HEIC/HEIF MIME types or file extensions.
pub fn needs_conversion(declared_type: &str) -> bool {
    let lower = declared_type.trim().to_ascii_lowercase();
    let tail = lower.rsplit(['/', '.']).next().unwrap_or(&lower);
    matches!(tail, "heic" | "heif" | "heic-sequence" | "heif-sequence")
}
