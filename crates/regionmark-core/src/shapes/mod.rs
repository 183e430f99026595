//! Shape definitions: markers and the transient selection.

mod marker;
mod rectangle;
mod region;

pub use marker::{Marker, MarkerId, MarkerPatch};
pub use rectangle::Rectangle;
pub use region::Selection;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Common trait for the rectangular shapes the engine manipulates.
pub trait RegionShape {
    /// Get the bounding box in image coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point (in image coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }
}

/// Reference to one of the shapes owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeRef {
    Marker(MarkerId),
    Selection,
}
