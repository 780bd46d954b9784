//! Context padding around a selection and the inverse mapping of the backend result.
//!
//! The enhancement backend is sent `padded` (the selection plus surrounding
//! context) resized to a fixed long edge. Whatever size comes back, the part of
//! it that corresponds to the original selection is found by linear proportion.
//! This relies on the backend resizing uniformly, without letterboxing.

use crate::viewport::Rect;

/// Default padding on each side, as a fraction of the selection's own size.
pub const DEFAULT_PADDING_FACTOR: f64 = 0.5;

/// Default long edge of crops sent to, and committed from, the backend.
pub const DEFAULT_LONG_EDGE: u32 = 1024;

/// Expands `rect` by `padding_factor` of its size on every side, clamped to the image.
///
/// The low edges are clamped to zero first; the padded size is then cut at the
/// far image edge. A rect pushed past an edge is not re-centered.
pub fn pad_rect(rect: &Rect, image_w: f64, image_h: f64, padding_factor: f64) -> Rect {
    let pad_w = rect.w * padding_factor;
    let pad_h = rect.h * padding_factor;

    let x = (rect.x - pad_w).max(0.0).min(image_w);
    let y = (rect.y - pad_h).max(0.0).min(image_h);
    let w = (rect.w + 2.0 * pad_w).min(image_w - x).max(0.0);
    let h = (rect.h + 2.0 * pad_h).min(image_h - y).max(0.0);

    Rect { x, y, w, h }
}

/// Pixel size for a resize of `rect` whose long edge is `long_edge`.
///
/// The short edge keeps the aspect ratio, rounded to the nearest pixel and never below one.
pub fn target_dimensions(rect: &Rect, long_edge: u32) -> (u32, u32) {
    if rect.w <= 0.0 || rect.h <= 0.0 {
        return (long_edge, long_edge);
    }

    let long = long_edge as f64;
    if rect.w >= rect.h {
        let h = (long * rect.h / rect.w).round().max(1.0) as u32;
        (long_edge, h)
    } else {
        let w = (long * rect.w / rect.h).round().max(1.0) as u32;
        (w, long_edge)
    }
}

/// Locates `original` inside a `result_w` x `result_h` image that was produced from `padded`.
pub fn inverse_map(original: &Rect, padded: &Rect, result_w: u32, result_h: u32) -> Rect {
    if padded.w <= 0.0 || padded.h <= 0.0 {
        return Rect::full(result_w, result_h);
    }

    let sx = result_w as f64 / padded.w;
    let sy = result_h as f64 / padded.h;
    Rect {
        x: (original.x - padded.x) * sx,
        y: (original.y - padded.y) * sy,
        w: original.w * sx,
        h: original.h * sy,
    }
}

/// Centered, aspect-preserving placement of a result inside the viewport.
///
/// `edge_padding` is the fraction of each viewport dimension kept free on either side.
pub fn layout_in_viewport(
    aspect_ratio: f64,
    viewport_w: f64,
    viewport_h: f64,
    edge_padding: f64,
) -> Rect {
    let avail_w = (viewport_w * (1.0 - 2.0 * edge_padding)).max(0.0);
    let avail_h = (viewport_h * (1.0 - 2.0 * edge_padding)).max(0.0);
    if aspect_ratio <= 0.0 || avail_w <= 0.0 || avail_h <= 0.0 {
        return Rect::new(viewport_w / 2.0, viewport_h / 2.0, 0.0, 0.0);
    }

    let (w, h) = if avail_w / avail_h > aspect_ratio {
        (avail_h * aspect_ratio, avail_h)
    } else {
        (avail_w, avail_w / aspect_ratio)
    };

    Rect {
        x: (viewport_w - w) / 2.0,
        y: (viewport_h - h) / 2.0,
        w,
        h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn corner_selection_clamps_low_edge_only() {
        let rect = Rect::new(10.0, 10.0, 100.0, 100.0);
        let padded = pad_rect(&rect, 500.0, 500.0, DEFAULT_PADDING_FACTOR);
        assert_eq!(padded, Rect::new(0.0, 0.0, 200.0, 200.0));

        let crop = inverse_map(&rect, &padded, 1024, 1024);
        assert!(approx(crop.x, 51.2));
        assert!(approx(crop.y, 51.2));
        assert!(approx(crop.w, 512.0));
        assert!(approx(crop.h, 512.0));
    }

    #[test]
    fn interior_selection_grows_by_padding_squared() {
        let rect = Rect::new(200.0, 300.0, 80.0, 60.0);
        let p = 0.5;
        let padded = pad_rect(&rect, 1000.0, 1000.0, p);
        assert_eq!(padded, Rect::new(160.0, 270.0, 160.0, 120.0));
        assert!(approx(padded.area(), (1.0 + 2.0 * p).powi(2) * rect.area()));
    }

    #[test]
    fn padded_rect_stays_inside_image() {
        let cases = [
            Rect::new(0.0, 0.0, 640.0, 480.0),
            Rect::new(600.0, 440.0, 40.0, 40.0),
            Rect::new(590.0, 5.0, 50.0, 470.0),
            Rect::new(300.0, 200.0, 20.0, 20.0),
        ];
        for rect in cases {
            let padded = pad_rect(&rect, 640.0, 480.0, 0.5);
            assert!(padded.x >= 0.0 && padded.y >= 0.0, "{padded:?}");
            assert!(padded.right() <= 640.0 + 1e-9, "{padded:?}");
            assert!(padded.bottom() <= 480.0 + 1e-9, "{padded:?}");
        }
    }

    #[test]
    fn far_edge_is_cut_without_recentering() {
        let rect = Rect::new(600.0, 100.0, 40.0, 40.0);
        let padded = pad_rect(&rect, 640.0, 480.0, 0.5);
        assert_eq!(padded, Rect::new(580.0, 80.0, 60.0, 80.0));
    }

    #[test]
    fn target_dimensions_preserve_aspect() {
        let wide = Rect::new(0.0, 0.0, 300.0, 200.0);
        let tall = Rect::new(0.0, 0.0, 100.0, 400.0);
        let sliver = Rect::new(0.0, 0.0, 5000.0, 1.0);
        assert_eq!(target_dimensions(&wide, 1024), (1024, 683));
        assert_eq!(target_dimensions(&tall, 1024), (256, 1024));
        assert_eq!(target_dimensions(&sliver, 1024), (1024, 1));
    }

    #[test]
    fn inverse_map_scales_by_result_over_padded() {
        let original = Rect::new(200.45, 200.45, 10.1, 10.1);
        let padded = Rect::new(195.0, 195.0, 21.0, 21.0);

        let crop = inverse_map(&original, &padded, 1024, 2048);
        assert!(approx(crop.x, 5.45 * 1024.0 / 21.0));
        assert!(approx(crop.y, 5.45 * 2048.0 / 21.0));
        assert!(approx(crop.w, 10.1 * 1024.0 / 21.0));
        assert!(approx(crop.h, 10.1 * 2048.0 / 21.0));
    }

    #[test]
    fn layout_centers_and_respects_edge_padding() {
        let wide = layout_in_viewport(2.0, 1000.0, 1000.0, 0.05);
        assert!(approx(wide.w, 900.0));
        assert!(approx(wide.h, 450.0));
        assert!(approx(wide.x, 50.0));
        assert!(approx(wide.y, 275.0));

        let tall = layout_in_viewport(0.5, 1000.0, 500.0, 0.05);
        assert!(approx(tall.h, 450.0));
        assert!(approx(tall.w, 225.0));
        assert!(approx(tall.x, 387.5));
    }
}
