//! Screen-space / image-space coordinate mapping.
//!
//! A point on screen is reached from native image pixels in two stages:
//!
//! ```text
//! image --(fit scale + letterbox offset)--> canvas --(zoom scale + pan)--> screen
//! ```
//!
//! The fit is recomputed from the canvas size on every frame; the interactive
//! [`ViewportTransform`] is only changed by wheel and pan input.

use serde::{Deserialize, Serialize};

/// Smallest interactive zoom.
pub const MIN_SCALE: f64 = 0.25;
/// Largest interactive zoom.
pub const MAX_SCALE: f64 = 20.0;
/// Zoom multiplier per wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

/// A 2D point. The coordinate space is a contract of the call site.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle with non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Builds a rect, folding negative sizes into a positive extent.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::from_corners(Point::new(x, y), Point::new(x + w, y + h))
    }

    /// The min/max bounding box of two opposite corners, in any drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            w: a.x.max(b.x) - x,
            h: a.y.max(b.y) - y,
        }
    }

    /// The whole extent of a `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: width as f64,
            h: height as f64,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Width divided by height; `1.0` for a zero-height rect.
    pub fn aspect_ratio(&self) -> f64 {
        if self.h > 0.0 { self.w / self.h } else { 1.0 }
    }

    /// True when either side is below `threshold`.
    pub fn is_degenerate(&self, threshold: f64) -> bool {
        self.w < threshold || self.h < threshold
    }

    /// Intersection with `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        let x0 = self.x.clamp(0.0, width);
        let y0 = self.y.clamp(0.0, height);
        let x1 = self.right().clamp(0.0, width);
        let y1 = self.bottom().clamp(0.0, height);
        Self {
            x: x0,
            y: y0,
            w: (x1 - x0).max(0.0),
            h: (y1 - y0).max(0.0),
        }
    }

    /// Rounds to whole pixels inside a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the rect survives the rounding.
    pub fn to_pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamped = self.clamp_to(width as f64, height as f64);
        let x0 = clamped.x.round() as u32;
        let y0 = clamped.y.round() as u32;
        let x1 = (clamped.right().round() as u32).min(width);
        let y1 = (clamped.bottom().round() as u32).min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }

    /// The whole-pixel rect that [`Rect::to_pixel_bounds`] reads out of the image.
    pub fn snap_to_pixels(&self, width: u32, height: u32) -> Option<Self> {
        let (x, y, w, h) = self.to_pixel_bounds(width, height)?;
        Some(Self {
            x: x as f64,
            y: y as f64,
            w: w as f64,
            h: h as f64,
        })
    }
}

/// Letterbox/pillarbox placement of an image inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasFit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub draw_w: f64,
    pub draw_h: f64,
}

impl CanvasFit {
    /// A 1:1 fit with no offset, i.e. canvas pixels are image pixels.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        draw_w: 0.0,
        draw_h: 0.0,
    };
}

/// Fits an image into the canvas preserving aspect ratio, centering the short axis.
pub fn fit_image_to_canvas(image_w: f64, image_h: f64, canvas_w: f64, canvas_h: f64) -> CanvasFit {
    if image_w <= 0.0 || image_h <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
        return CanvasFit {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            draw_w: image_w.max(0.0),
            draw_h: image_h.max(0.0),
        };
    }

    let scale = (canvas_w / image_w).min(canvas_h / image_h);
    let draw_w = image_w * scale;
    let draw_h = image_h * scale;
    CanvasFit {
        scale,
        offset_x: (canvas_w - draw_w) / 2.0,
        offset_y: (canvas_h - draw_h) / 2.0,
        draw_w,
        draw_h,
    }
}

/// Direction of one wheel notch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Wheel deltas follow the browser convention: negative scrolls toward the user, i.e. zoom in.
    pub fn from_wheel_delta(delta_y: f64) -> Option<Self> {
        if delta_y < 0.0 {
            Some(Self::In)
        } else if delta_y > 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// Interactive pan/zoom applied on top of the canvas fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewportTransform {
    pub const IDENTITY: Self = Self {
        pan_x: 0.0,
        pan_y: 0.0,
        scale: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Translates the view by a screen-space delta.
    pub fn pan_by(self, dx: f64, dy: f64) -> Self {
        Self {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..self
        }
    }

    /// Zooms one notch toward `pivot`, keeping the pivot fixed on screen.
    pub fn apply_zoom(self, pivot: Point, direction: ZoomDirection) -> Self {
        let target = match direction {
            ZoomDirection::In => self.scale * ZOOM_STEP,
            ZoomDirection::Out => self.scale / ZOOM_STEP,
        };
        let scale = target.clamp(MIN_SCALE, MAX_SCALE);
        if scale == self.scale {
            return self;
        }

        let ratio = scale / self.scale;
        Self {
            pan_x: pivot.x - (pivot.x - self.pan_x) * ratio,
            pan_y: pivot.y - (pivot.y - self.pan_y) * ratio,
            scale,
        }
    }
}

/// Maps native image pixels to screen pixels.
pub fn image_to_screen(point: Point, transform: &ViewportTransform, fit: &CanvasFit) -> Point {
    let canvas_x = point.x * fit.scale + fit.offset_x;
    let canvas_y = point.y * fit.scale + fit.offset_y;
    Point {
        x: canvas_x * transform.scale + transform.pan_x,
        y: canvas_y * transform.scale + transform.pan_y,
    }
}

/// Maps screen pixels back to native image pixels.
pub fn screen_to_image(point: Point, transform: &ViewportTransform, fit: &CanvasFit) -> Point {
    let canvas_x = (point.x - transform.pan_x) / transform.scale;
    let canvas_y = (point.y - transform.pan_y) / transform.scale;
    Point {
        x: (canvas_x - fit.offset_x) / fit.scale,
        y: (canvas_y - fit.offset_y) / fit.scale,
    }
}

/// Maps an image-space rect to screen space, corner by corner.
pub fn image_rect_to_screen(rect: &Rect, transform: &ViewportTransform, fit: &CanvasFit) -> Rect {
    let a = image_to_screen(Point::new(rect.x, rect.y), transform, fit);
    let b = image_to_screen(Point::new(rect.right(), rect.bottom()), transform, fit);
    Rect::from_corners(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn wide_image_is_letterboxed() {
        let fit = fit_image_to_canvas(2000.0, 1000.0, 800.0, 800.0);
        assert!((fit.scale - 0.4).abs() < EPS);
        assert!((fit.draw_w - 800.0).abs() < EPS);
        assert!((fit.draw_h - 400.0).abs() < EPS);
        assert!(fit.offset_x.abs() < EPS);
        assert!((fit.offset_y - 200.0).abs() < EPS);
    }

    #[test]
    fn tall_image_is_pillarboxed() {
        let fit = fit_image_to_canvas(500.0, 1000.0, 1000.0, 500.0);
        assert!((fit.scale - 0.5).abs() < EPS);
        assert!((fit.offset_x - 375.0).abs() < EPS);
        assert!(fit.offset_y.abs() < EPS);
    }

    #[test]
    fn screen_image_round_trip() {
        let fit = fit_image_to_canvas(640.0, 480.0, 1280.0, 720.0);
        let transforms = [
            ViewportTransform::IDENTITY,
            ViewportTransform {
                pan_x: -37.5,
                pan_y: 12.0,
                scale: 3.2,
            },
            ViewportTransform {
                pan_x: 400.0,
                pan_y: -220.0,
                scale: MIN_SCALE,
            },
            ViewportTransform {
                pan_x: 1.0,
                pan_y: 2.0,
                scale: MAX_SCALE,
            },
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(320.5, 17.25),
            Point::new(639.0, 479.0),
        ];

        for t in &transforms {
            for p in points {
                let back = screen_to_image(image_to_screen(p, t, &fit), t, &fit);
                assert!(close(back, p), "{p:?} -> {back:?} under {t:?}");
            }
        }
    }

    #[test]
    fn zoom_keeps_pivot_fixed() {
        let fit = fit_image_to_canvas(1000.0, 800.0, 1200.0, 900.0);
        let pivot = Point::new(431.0, 275.0);
        let mut t = ViewportTransform {
            pan_x: 15.0,
            pan_y: -40.0,
            scale: 1.7,
        };

        for direction in [ZoomDirection::In, ZoomDirection::In, ZoomDirection::Out] {
            let under_pivot = screen_to_image(pivot, &t, &fit);
            t = t.apply_zoom(pivot, direction);
            let after = image_to_screen(under_pivot, &t, &fit);
            assert!(close(after, pivot));
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut t = ViewportTransform::IDENTITY;
        for _ in 0..200 {
            t = t.apply_zoom(Point::new(10.0, 10.0), ZoomDirection::In);
        }
        assert_eq!(t.scale, MAX_SCALE);

        let stuck = t.apply_zoom(Point::new(99.0, 99.0), ZoomDirection::In);
        assert_eq!(stuck, t);

        for _ in 0..400 {
            t = t.apply_zoom(Point::new(10.0, 10.0), ZoomDirection::Out);
        }
        assert_eq!(t.scale, MIN_SCALE);
    }

    #[test]
    fn wheel_delta_sign_picks_direction() {
        assert_eq!(ZoomDirection::from_wheel_delta(-120.0), Some(ZoomDirection::In));
        assert_eq!(ZoomDirection::from_wheel_delta(3.0), Some(ZoomDirection::Out));
        assert_eq!(ZoomDirection::from_wheel_delta(0.0), None);
    }

    #[test]
    fn rect_from_corners_normalizes_drag_direction() {
        let r = Rect::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn pixel_bounds_are_clipped_to_image() {
        let r = Rect::new(-5.0, 90.4, 30.0, 40.0);
        assert_eq!(r.to_pixel_bounds(100, 100), Some((0, 90, 25, 10)));
        assert_eq!(Rect::new(120.0, 0.0, 5.0, 5.0).to_pixel_bounds(100, 100), None);
    }

    #[test]
    fn snapped_rect_is_the_cropped_extent() {
        let r = Rect::new(195.4, 195.4, 20.2, 20.2);
        assert_eq!(r.snap_to_pixels(400, 400), Some(Rect::new(195.0, 195.0, 21.0, 21.0)));
        assert_eq!(Rect::new(-3.0, 0.2, 10.0, 0.2).snap_to_pixels(50, 50), None);
    }

    #[test]
    fn image_rect_lands_on_screen_through_fit_and_zoom() {
        let fit = fit_image_to_canvas(1000.0, 1000.0, 500.0, 500.0);
        let t = ViewportTransform {
            pan_x: 10.0,
            pan_y: -20.0,
            scale: 2.0,
        };
        let screen = image_rect_to_screen(&Rect::new(100.0, 100.0, 200.0, 50.0), &t, &fit);
        assert_eq!(screen, Rect::new(110.0, 80.0, 200.0, 50.0));
    }
}
