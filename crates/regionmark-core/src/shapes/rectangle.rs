//! Axis-aligned rectangle in image space.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A rectangle in image space (pixel coordinates of the loaded bitmap).
///
/// Width and height are never negative once a rectangle has gone through a
/// constructor, deserialization or the shape store. The fields stay public,
/// so a struct literal can still hold a negative size until
/// [`Rectangle::normalized`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RectangleFields")]
pub struct Rectangle {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
}

impl Rectangle {
    /// Create a new rectangle. Negative sizes are flipped around the given corner.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
        .normalized()
    }

    /// Flip negative sizes so the rectangle covers the same area.
    ///
    /// Non-negative fields are returned untouched, bit for bit.
    pub fn normalized(self) -> Self {
        let mut rect = self;
        if rect.width < 0.0 {
            rect.x += rect.width;
            rect.width = -rect.width;
        }
        if rect.height < 0.0 {
            rect.y += rect.height;
            rect.height = -rect.height;
        }
        rect
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p2.x - p1.x).abs(),
            height: (p2.y - p1.y).abs(),
        }
    }

    /// Create a rectangle from a kurbo Rect.
    pub fn from_rect(rect: Rect) -> Self {
        Self::from_corners(Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1))
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Check if a point lies inside the rectangle grown by `tolerance`.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        self.as_rect().inflate(tolerance, tolerance).contains(point)
    }
}

/// Wire form of [`Rectangle`]; deserialized values are normalized on the way in.
#[derive(Deserialize)]
struct RectangleFields {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<RectangleFields> for Rectangle {
    fn from(fields: RectangleFields) -> Self {
        Rectangle::new(fields.x, fields.y, fields.width, fields.height)
    }
}

impl From<Rect> for Rectangle {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<Rectangle> for Rect {
    fn from(rect: Rectangle) -> Self {
        rect.as_rect()
    }
}
