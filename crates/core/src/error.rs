//! Error types for the zoom-enhance-core library.
//!
//! Backend failures, decode failures and conversion failures each get their own
//! variant so the editor can decide how far to roll back and what to tell the user.

use thiserror::Error;

/// Message shown when a backend error carries no usable text.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while enhancing the image. Please try again.";

/// Message shown when the backend reports quota or resource exhaustion.
pub const QUOTA_MESSAGE: &str =
    "The enhancement service is out of quota right now. Please wait a minute and try again.";

/// Errors that can occur within the zoom-enhance-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Image cropping, resizing or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Bytes could not be decoded into an image.
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// The selection area is empty or has zero dimensions.
    #[error("Selection area is empty or invalid")]
    EmptySelection,

    /// General Gemini API error.
    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    /// The backend rejected the call for quota or rate reasons.
    #[error("Rate limited by Gemini API, please retry later")]
    RateLimited,

    /// The backend answered, but not with something we can use.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// HEIC/HEIF (or other) conversion to a decodable format failed.
    #[error("Format conversion failed: {0}")]
    FormatConversion(String),

    /// Still or animated export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates a Gemini API error with the given message.
    pub fn gemini(msg: impl Into<String>) -> Self {
        Self::GeminiApi(msg.into())
    }

    /// Creates a malformed-response error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Creates a format conversion error with the given message.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::FormatConversion(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Classifies a failed backend call from its HTTP status and error body.
    ///
    /// HTTP 429 or a `RESOURCE_EXHAUSTED` status in the body becomes
    /// [`AppError::RateLimited`]; anything else keeps the body as [`AppError::GeminiApi`].
    pub fn from_backend(status: Option<u16>, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == Some(429) || body.contains("RESOURCE_EXHAUSTED") {
            Self::RateLimited
        } else {
            Self::GeminiApi(body)
        }
    }

    /// The text for the editor's error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => QUOTA_MESSAGE.to_string(),
            Self::GeminiApi(msg) | Self::MalformedResponse(msg) | Self::Decode(msg) => {
                if msg.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    msg.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_responses_are_classified_as_rate_limited() {
        let err = AppError::from_backend(Some(429), "");
        assert!(matches!(err, AppError::RateLimited));
        assert_eq!(err.user_message(), QUOTA_MESSAGE);

        let body = r#"{"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(AppError::from_backend(None, body), AppError::RateLimited));
    }

    #[test]
    fn stray_429_in_a_message_is_not_a_quota_error() {
        let err = AppError::from_backend(Some(400), "payload of 4290 bytes rejected");
        assert!(matches!(err, AppError::GeminiApi(_)));
        assert_eq!(err.user_message(), "payload of 4290 bytes rejected");
    }

    #[test]
    fn other_backend_errors_surface_raw_message() {
        let err = AppError::from_backend(Some(503), "model overloaded");
        assert_eq!(err.user_message(), "model overloaded");
    }

    #[test]
    fn empty_backend_message_falls_back_to_generic() {
        assert_eq!(AppError::gemini("  ").user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
