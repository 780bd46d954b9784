//! Drag-to-select handling.
//!
//! Pointer positions arrive in screen space and are stored in image space, so a
//! pan or zoom in the middle of a drag does not move the anchored corner.

use super::geometry::{CanvasFit, Point, Rect, ViewportTransform, screen_to_image};

/// Result of feeding one pointer event into a [`SelectionDrag`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// User started a new selection drag.
    Started,
    /// User is actively dragging.
    Dragging,
    /// User released a drag large enough to keep. Rect is in image space.
    Completed(Rect),
    /// User released a drag that was too small, or cancelled it.
    Cancelled,
    /// No selection event occurred.
    None,
}

/// In-progress rectangle selection, anchored in image space.
#[derive(Debug, Clone, Default)]
pub struct SelectionDrag {
    start: Option<Point>,
    current: Option<Point>,
}

impl SelectionDrag {
    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// The normalized rect between the anchor and the pointer, if dragging.
    pub fn rect(&self) -> Option<Rect> {
        match (self.start, self.current) {
            (Some(s), Some(c)) => Some(Rect::from_corners(s, c)),
            _ => None,
        }
    }

    pub fn begin(
        &mut self,
        screen: Point,
        transform: &ViewportTransform,
        fit: &CanvasFit,
    ) -> SelectionEvent {
        let p = screen_to_image(screen, transform, fit);
        self.start = Some(p);
        self.current = Some(p);
        SelectionEvent::Started
    }

    pub fn update(
        &mut self,
        screen: Point,
        transform: &ViewportTransform,
        fit: &CanvasFit,
    ) -> SelectionEvent {
        if self.start.is_none() {
            return SelectionEvent::None;
        }
        self.current = Some(screen_to_image(screen, transform, fit));
        SelectionEvent::Dragging
    }

    /// Ends the drag. Degenerate rects (either side under `min_size`) are discarded.
    pub fn release(&mut self, min_size: f64) -> SelectionEvent {
        let Some(rect) = self.rect() else {
            return SelectionEvent::None;
        };
        self.clear();

        if rect.is_degenerate(min_size) {
            SelectionEvent::Cancelled
        } else {
            SelectionEvent::Completed(rect)
        }
    }

    /// Escape while dragging: drop the selection, commit nothing.
    pub fn cancel(&mut self) -> SelectionEvent {
        if self.start.is_none() {
            return SelectionEvent::None;
        }
        self.clear();
        SelectionEvent::Cancelled
    }

    fn clear(&mut self) {
        self.start = None;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::geometry::fit_image_to_canvas;

    #[test]
    fn reverse_drag_yields_positive_rect_in_image_space() {
        let fit = fit_image_to_canvas(1000.0, 1000.0, 500.0, 500.0);
        let t = ViewportTransform::IDENTITY;
        let mut drag = SelectionDrag::default();

        drag.begin(Point::new(200.0, 150.0), &t, &fit);
        drag.update(Point::new(100.0, 50.0), &t, &fit);
        let event = drag.release(10.0);

        assert_eq!(event, SelectionEvent::Completed(Rect::new(200.0, 100.0, 200.0, 200.0)));
        assert!(!drag.is_active());
    }

    #[test]
    fn short_drag_is_discarded() {
        let fit = CanvasFit::IDENTITY;
        let t = ViewportTransform::IDENTITY;
        let mut drag = SelectionDrag::default();

        drag.begin(Point::new(10.0, 10.0), &t, &fit);
        drag.update(Point::new(200.0, 15.0), &t, &fit);
        assert_eq!(drag.release(10.0), SelectionEvent::Cancelled);
    }

    #[test]
    fn cancel_resets_without_commit() {
        let fit = CanvasFit::IDENTITY;
        let t = ViewportTransform::IDENTITY;
        let mut drag = SelectionDrag::default();

        drag.begin(Point::new(0.0, 0.0), &t, &fit);
        drag.update(Point::new(80.0, 80.0), &t, &fit);
        assert_eq!(drag.cancel(), SelectionEvent::Cancelled);
        assert_eq!(drag.rect(), None);
        assert_eq!(drag.release(10.0), SelectionEvent::None);
    }

    #[test]
    fn update_without_begin_is_ignored() {
        let mut drag = SelectionDrag::default();
        let event = drag.update(
            Point::new(5.0, 5.0),
            &ViewportTransform::IDENTITY,
            &CanvasFit::IDENTITY,
        );
        assert_eq!(event, SelectionEvent::None);
    }
}
