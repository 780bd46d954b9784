//! Zoom-Enhance Core Library
//!
//! Select a region of a photo, send it to a generative model for enhancement,
//! splice the result back in, and repeat, with a linear undo/redo history and
//! GIF export of the whole zoom.
//!
//! # Overview
//!
//! - **Viewport**: pan/zoom and the screen/image coordinate mapping via [`viewport`]
//! - **Region**: context padding and inverse mapping of results via [`region`]
//! - **History**: undo/redo with branch truncation via [`history`]
//! - **Orchestration**: the per-job state machine via [`orchestrator`]
//! - **Session**: everything above behind one [`Editor`]
//! - **Backends**: service traits in [`services`], Gemini implementation in [`gemini`]
//!
//! # Quick Start
//!
//! ```ignore
//! use zoom_enhance_core::{Config, Editor, GeminiClient, Rect};
//!
//! let config = Config::load()?;
//! let client = GeminiClient::new(&config)?;
//! let mut editor = Editor::new(config.editor.clone());
//!
//! editor.load_decoded(image::open("photo.jpg")?);
//! editor.enhance_selection(Rect::new(120.0, 80.0, 200.0, 150.0), &client).await?;
//! editor.complete_reveal();
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod gemini;
pub mod handle;
pub mod history;
pub mod image_processing;
pub mod orchestrator;
pub mod region;
pub mod services;
pub mod viewport;

// Re-export primary types for convenience
pub use config::{Config, EditorSettings};
pub use editor::{Editor, EditorPhase};
pub use error::{AppError, Result};
pub use export::GifOptions;
pub use gemini::GeminiClient;
pub use handle::ImageHandle;
pub use history::{History, HistoryStep, ImageDescription};
pub use services::Dials;
pub use viewport::{Point, Rect, ViewportTransform};

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
