//! Configuration loading.
//!
//! [`Config`] carries backend credentials and model names, [`EditorSettings`]
//! carries the numeric constants of the selection-to-enhancement pipeline.

use std::env;
use crate::error::{AppError, Result};
use crate::region::{DEFAULT_LONG_EDGE, DEFAULT_PADDING_FACTOR};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

/// Default model for descriptions and the settings advisor.
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Default model for image enhancement.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String,
    pub image_model_name: String,
    pub editor: EditorSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model_name = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let image_model_name = env::var("GEMINI_IMAGE_MODEL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        Ok(Self {
            gemini_api_key: api_key,
            model_name,
            image_model_name,
            editor: EditorSettings::from_env()?,
        })
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Programmatic construction of a [`Config`], e.g. for CLI overrides.
#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
    image_model: Option<String>,
    editor: Option<EditorSettings>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_image_model(mut self, model: &str) -> Self {
        self.image_model = Some(model.to_string());
        self
    }

    pub fn with_editor_settings(mut self, settings: EditorSettings) -> Self {
        self.editor = Some(settings);
        self
    }

    pub fn build(self) -> Result<Config> {
        let gemini_api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::config("an API key is required"))?;

        let editor = self.editor.unwrap_or_default();
        editor.validate()?;

        Ok(Config {
            gemini_api_key,
            model_name: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            image_model_name: self
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            editor,
        })
    }
}

/// Tunables of the selection, padding and export pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Context padding added on each side, as a fraction of the selection size.
    pub padding_factor: f64,
    /// Long edge, in pixels, of the crop sent to the enhancement backend.
    pub request_long_edge: u32,
    /// Long edge, in pixels, of the committed history image.
    pub final_long_edge: u32,
    /// Fraction of the viewport kept free on each edge when laying out a result.
    pub layout_edge_padding: f64,
    /// Block size of the pixelated placeholder.
    pub placeholder_block: u32,
    /// Selections narrower or shorter than this (image pixels) are discarded.
    pub min_selection_size: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            padding_factor: DEFAULT_PADDING_FACTOR,
            request_long_edge: DEFAULT_LONG_EDGE,
            final_long_edge: DEFAULT_LONG_EDGE,
            layout_edge_padding: 0.05,
            placeholder_block: 16,
            min_selection_size: 10.0,
        }
    }
}

impl EditorSettings {
    /// Defaults, overridden by `ENHANCE_PADDING` and `ENHANCE_LONG_EDGE` when set.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(raw) = env::var("ENHANCE_PADDING") {
            settings.padding_factor = raw
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("ENHANCE_PADDING is not a number: {raw}")))?;
        }

        if let Ok(raw) = env::var("ENHANCE_LONG_EDGE") {
            let edge: u32 = raw.trim().parse().map_err(|_| {
                AppError::config(format!("ENHANCE_LONG_EDGE is not an integer: {raw}"))
            })?;
            settings.request_long_edge = edge;
            settings.final_long_edge = edge;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=4.0).contains(&self.padding_factor) {
            return Err(AppError::config(format!(
                "padding factor must be within [0, 4], got {}",
                self.padding_factor
            )));
        }
        if self.request_long_edge == 0 || self.final_long_edge == 0 {
            return Err(AppError::config("long edge sizes must be positive"));
        }
        if !(0.0..0.5).contains(&self.layout_edge_padding) {
            return Err(AppError::config("layout edge padding must be within [0, 0.5)"));
        }
        if self.placeholder_block == 0 {
            return Err(AppError::config("placeholder block size must be positive"));
        }
        Ok(())
    }
}
