//! Viewport geometry and pointer selection.
//!
//! - [`geometry`]: fit, pan/zoom transform and the screen/image mapping
//! - [`selection`]: drag-to-select state

pub mod geometry;
pub mod selection;

pub use geometry::{
    CanvasFit, Point, Rect, ViewportTransform, ZoomDirection, fit_image_to_canvas,
    image_rect_to_screen, image_to_screen, screen_to_image,
};
pub use selection::{SelectionDrag, SelectionEvent};
