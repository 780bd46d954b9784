//! Still and animated export of the history.
//!
//! The animation replays the zoom: for every step after the root, frames crop
//! progressively from the parent's full extent into the enhanced rect, then the
//! enhanced step itself is held.

use crate::error::{AppError, Result};
use crate::history::HistoryStep;
use crate::image_processing::ImageProcessor;
use crate::viewport::Rect;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Frame size and timing of the zoom animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GifOptions {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Intermediate frames per zoom transition.
    pub frames_per_zoom: u32,
    pub frame_delay_ms: u32,
    /// How long each history step is held.
    pub hold_delay_ms: u32,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            frame_width: 512,
            frame_height: 512,
            frames_per_zoom: 12,
            frame_delay_ms: 60,
            hold_delay_ms: 1200,
        }
    }
}

/// Encodes one step's image as a still.
pub fn encode_still(step: &HistoryStep, format: ImageFormat) -> Result<Vec<u8>> {
    ImageProcessor::encode(step.image.image(), format)
}

fn lerp_rect(from: &Rect, to: &Rect, t: f64) -> Rect {
    Rect {
        x: from.x + (to.x - from.x) * t,
        y: from.y + (to.y - from.y) * t,
        w: from.w + (to.w - from.w) * t,
        h: from.h + (to.h - from.h) * t,
    }
}

fn ease_in_out(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Builds the frame sequence with per-frame delays.
pub fn zoom_frames(steps: &[HistoryStep], options: &GifOptions) -> Result<Vec<(RgbaImage, u32)>> {
    let (fw, fh) = (options.frame_width.max(1), options.frame_height.max(1));
    let mut frames = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        if i > 0
            && let Some(target) = step.original_rect
        {
            let parent: &DynamicImage = steps[i - 1].image.image();
            let full = Rect::full(parent.width(), parent.height());
            let n = options.frames_per_zoom;
            for k in 1..=n {
                let t = ease_in_out(k as f64 / (n + 1) as f64);
                let crop = ImageProcessor::crop(parent, &lerp_rect(&full, &target, t))?;
                frames.push((ImageProcessor::letterbox(&crop, fw, fh), options.frame_delay_ms));
            }
        }
        frames.push((ImageProcessor::letterbox(step.image.image(), fw, fh), options.hold_delay_ms));
    }

    Ok(frames)
}

/// Renders the history prefix as a looping GIF.
pub fn render_zoom_gif(steps: &[HistoryStep], options: &GifOptions) -> Result<Vec<u8>> {
    if steps.is_empty() {
        return Err(AppError::export("history is empty"));
    }

    let frames = zoom_frames(steps, options)?;
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| AppError::export(format!("Failed to configure GIF: {}", e)))?;

        for (image, delay_ms) in frames.iter() {
            let delay = Delay::from_numer_denom_ms(*delay_ms, 1);
            let frame = Frame::from_parts(image.clone(), 0, 0, delay);
            encoder
                .encode_frame(frame)
                .map_err(|e| AppError::export(format!("Failed to encode GIF frame: {}", e)))?;
        }
    }

    info!(
        steps = steps.len(),
        frames = frames.len(),
        bytes = buffer.len(),
        "zoom GIF rendered"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ImageHandle;
    use crate::history::ImageDescription;

    fn steps() -> Vec<HistoryStep> {
        let root = HistoryStep::root(ImageHandle::new(DynamicImage::new_rgba8(200, 100)));
        let child = HistoryStep::enhancement(
            ImageHandle::new(DynamicImage::new_rgba8(128, 128)),
            ImageDescription {
                selection_description: "tree".into(),
                prompt: "detail".into(),
            },
            Rect::new(20.0, 10.0, 50.0, 50.0),
        );
        vec![root, child]
    }

    fn small() -> GifOptions {
        GifOptions {
            frame_width: 32,
            frame_height: 24,
            frames_per_zoom: 3,
            ..GifOptions::default()
        }
    }

    #[test]
    fn frames_include_transitions_and_holds() {
        let frames = zoom_frames(&steps(), &small()).unwrap();
        assert_eq!(frames.len(), 1 + 3 + 1);
        assert!(frames.iter().all(|(f, _)| f.dimensions() == (32, 24)));
        assert_eq!(frames[0].1, small().hold_delay_ms);
        assert_eq!(frames[1].1, small().frame_delay_ms);
    }

    #[test]
    fn gif_bytes_have_gif_header() {
        let bytes = render_zoom_gif(&steps(), &small()).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
    }

    #[test]
    fn empty_history_cannot_be_exported() {
        assert!(matches!(render_zoom_gif(&[], &small()), Err(AppError::Export(_))));
    }

    #[test]
    fn still_export_encodes_png() {
        let bytes = encode_still(&steps()[1], ImageFormat::Png).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
