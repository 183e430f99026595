//! Move and resize manipulation of a single shape.
//!
//! A drag works on the shape's screen-space box. Only when the drag ends is
//! the final box converted back into image space and committed.

use crate::camera::Viewport;
use crate::shapes::{Rectangle, ShapeRef};
use crate::widget::HandleKind;
use kurbo::{Point, Rect, Vec2};

/// State of an active manipulation (move or resize of one shape).
#[derive(Debug, Clone)]
pub struct ManipulationState {
    /// The shape being manipulated.
    pub target: ShapeRef,
    /// The handle being dragged (None = moving the whole shape).
    pub handle: Option<HandleKind>,
    /// Starting point of the drag, screen space.
    pub start_point: Point,
    /// Current point of the drag, screen space.
    pub current_point: Point,
    /// Screen box of the shape when the drag started.
    pub original: Rect,
    /// Last accepted screen box.
    pub preview: Rect,
}

impl ManipulationState {
    /// Start a manipulation.
    pub fn new(
        target: ShapeRef,
        handle: Option<HandleKind>,
        start_point: Point,
        original: Rect,
    ) -> Self {
        Self {
            target,
            handle,
            start_point,
            current_point: start_point,
            original,
            preview: original,
        }
    }

    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// Whether the pointer travelled further than `tolerance` from the press point.
    pub fn has_moved(&self, tolerance: f64) -> bool {
        self.delta().hypot() > tolerance
    }

    /// Track the pointer and recompute the preview box.
    ///
    /// `min_size` is the smallest allowed box side in screen pixels. A resize
    /// step below it is rejected and the previous box kept. Returns whether
    /// the step was accepted.
    pub fn update(&mut self, point: Point, min_size: f64) -> bool {
        self.current_point = point;
        let delta = self.delta();
        match self.handle {
            None => {
                self.preview = apply_move(self.original, delta);
                true
            }
            Some(handle) => match apply_resize(self.original, handle, delta, min_size) {
                Some(rect) => {
                    self.preview = rect;
                    true
                }
                None => {
                    log::debug!("Rejected resize of {:?} below {} px", self.target, min_size);
                    false
                }
            },
        }
    }

    /// The final geometry in image space.
    pub fn commit(&self, viewport: &Viewport) -> Rectangle {
        Rectangle::from_rect(viewport.rect_to_image(self.preview))
    }
}

/// Translate a box by a delta.
pub fn apply_move(bounds: Rect, delta: Vec2) -> Rect {
    bounds + delta
}

/// Move the edges a handle controls by `delta`.
///
/// The result is normalized, so dragging past the opposite edge flips the box.
/// Returns `None` if either side would be smaller than `min_size`. The aspect
/// ratio is never locked.
pub fn apply_resize(bounds: Rect, handle: HandleKind, delta: Vec2, min_size: f64) -> Option<Rect> {
    let (left, right) = handle.moves_x();
    let (top, bottom) = handle.moves_y();

    let x0 = if left { bounds.x0 + delta.x } else { bounds.x0 };
    let x1 = if right { bounds.x1 + delta.x } else { bounds.x1 };
    let y0 = if top { bounds.y0 + delta.y } else { bounds.y0 };
    let y1 = if bottom { bounds.y1 + delta.y } else { bounds.y1 };

    let rect = Rect::new(x0, y0, x1, y1).abs();
    if rect.width() < min_size || rect.height() < min_size {
        return None;
    }
    Some(rect)
}
