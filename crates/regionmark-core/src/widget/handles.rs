//! Resize handle definitions.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// The kind of handle - determines which edges a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl HandleKind {
    /// All handles, corners first.
    pub const ALL: [HandleKind; 8] = [
        HandleKind::TopLeft,
        HandleKind::TopRight,
        HandleKind::BottomLeft,
        HandleKind::BottomRight,
        HandleKind::Top,
        HandleKind::Bottom,
        HandleKind::Left,
        HandleKind::Right,
    ];

    /// Whether dragging this handle moves the left / right edge.
    pub fn moves_x(&self) -> (bool, bool) {
        match self {
            HandleKind::TopLeft | HandleKind::BottomLeft | HandleKind::Left => (true, false),
            HandleKind::TopRight | HandleKind::BottomRight | HandleKind::Right => (false, true),
            HandleKind::Top | HandleKind::Bottom => (false, false),
        }
    }

    /// Whether dragging this handle moves the top / bottom edge.
    pub fn moves_y(&self) -> (bool, bool) {
        match self {
            HandleKind::TopLeft | HandleKind::TopRight | HandleKind::Top => (true, false),
            HandleKind::BottomLeft | HandleKind::BottomRight | HandleKind::Bottom => (false, true),
            HandleKind::Left | HandleKind::Right => (false, false),
        }
    }

    /// Position of this handle on a rectangle.
    pub fn position_on(&self, bounds: Rect) -> Point {
        let center = bounds.center();
        match self {
            HandleKind::TopLeft => Point::new(bounds.x0, bounds.y0),
            HandleKind::TopRight => Point::new(bounds.x1, bounds.y0),
            HandleKind::BottomLeft => Point::new(bounds.x0, bounds.y1),
            HandleKind::BottomRight => Point::new(bounds.x1, bounds.y1),
            HandleKind::Top => Point::new(center.x, bounds.y0),
            HandleKind::Bottom => Point::new(center.x, bounds.y1),
            HandleKind::Left => Point::new(bounds.x0, center.y),
            HandleKind::Right => Point::new(bounds.x1, center.y),
        }
    }
}

/// A resize handle on the focused shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// The kind of handle.
    pub kind: HandleKind,
    /// Position, in whichever space the bounds were given in.
    pub position: Point,
}

impl Handle {
    /// Create a new handle.
    pub fn new(kind: HandleKind, position: Point) -> Self {
        Self { kind, position }
    }

    /// Check if a point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Handles around a rectangle. Rotation handles are never produced.
pub fn rect_handles(bounds: Rect) -> Vec<Handle> {
    HandleKind::ALL
        .iter()
        .map(|kind| Handle::new(*kind, kind.position_on(bounds)))
        .collect()
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(bounds: Rect, point: Point, tolerance: f64) -> Option<HandleKind> {
    rect_handles(bounds)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.kind)
}
