//! Pixel-level helpers for the enhancement pipeline.
//!
//! The rectangles come from [`crate::region`]; this module only reads pixels
//! out of them, resizes, pixelates and (de)serializes.

use crate::error::{AppError, Result};
use crate::viewport::Rect;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Image processing utilities for the selection workflow.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Crops `region` (image pixels) out of `source` and resizes it to exactly `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptySelection`] if the region has no pixels inside the image.
    pub fn crop_resized(
        source: &DynamicImage,
        region: &Rect,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage> {
        let (x, y, w, h) = region
            .to_pixel_bounds(source.width(), source.height())
            .ok_or(AppError::EmptySelection)?;

        let cropped = source.crop_imm(x, y, w, h);
        if cropped.width() == width && cropped.height() == height {
            return Ok(cropped);
        }
        Ok(cropped.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3))
    }

    /// Crops `region` at native resolution.
    pub fn crop(source: &DynamicImage, region: &Rect) -> Result<DynamicImage> {
        let (x, y, w, h) = region
            .to_pixel_bounds(source.width(), source.height())
            .ok_or(AppError::EmptySelection)?;
        Ok(source.crop_imm(x, y, w, h))
    }

    /// Builds the blocky stand-in shown while the backend is working.
    ///
    /// The preview is shrunk so each output block covers `block` pixels of the
    /// target size, then blown back up with nearest-neighbour sampling.
    pub fn pixelate(preview: &DynamicImage, width: u32, height: u32, block: u32) -> DynamicImage {
        let width = width.max(1);
        let height = height.max(1);
        let block = block.max(1);
        let small_w = (width / block).max(1);
        let small_h = (height / block).max(1);

        preview
            .resize_exact(small_w, small_h, FilterType::Triangle)
            .resize_exact(width, height, FilterType::Nearest)
    }

    /// Decodes encoded bytes (PNG, JPEG, GIF) into an image.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(AppError::decode("no image data"));
        }
        image::load_from_memory(bytes)
            .map_err(|e| AppError::decode(format!("Failed to decode image: {}", e)))
    }

    /// Encodes an image to bytes in the given format.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        // JPEG has no alpha channel
        let result = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, format)
        } else {
            image.write_to(&mut cursor, format)
        };
        result.map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

        Ok(buffer)
    }

    /// Encodes an image as a Base64 PNG string, ready for API transmission.
    pub fn encode_to_base64_png(image: &DynamicImage) -> Result<String> {
        Ok(BASE64.encode(Self::encode(image, ImageFormat::Png)?))
    }

    /// Decodes a Base64 payload into an image.
    pub fn decode_base64(data: &str) -> Result<DynamicImage> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| AppError::decode(format!("Invalid base64 image payload: {}", e)))?;
        Self::decode(&bytes)
    }

    /// `data:image/png;base64,...` URL of the image.
    pub fn to_data_url(image: &DynamicImage) -> Result<String> {
        Ok(format!("data:image/png;base64,{}", Self::encode_to_base64_png(image)?))
    }

    /// Resizes `image` to fit inside `width` x `height`, centered on a black canvas.
    pub fn letterbox(image: &DynamicImage, width: u32, height: u32) -> image::RgbaImage {
        let mut canvas = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
        let fitted = image.resize(width, height, FilterType::Triangle).to_rgba8();
        let x = (width.saturating_sub(fitted.width())) / 2;
        let y = (height.saturating_sub(fitted.height())) / 2;
        image::imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
        canvas
    }
}
