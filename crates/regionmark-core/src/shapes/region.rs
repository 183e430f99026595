//! The single transient selection rectangle.

use super::{Rectangle, RegionShape};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// A region being drawn or waiting to be promoted to a marker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Geometry in image space.
    #[serde(flatten)]
    pub rect: Rectangle,
    /// Whether the selection is shown.
    pub visible: bool,
}

impl Selection {
    /// Create a selection. The geometry is normalized.
    pub fn new(rect: Rectangle, visible: bool) -> Self {
        Self {
            rect: rect.normalized(),
            visible,
        }
    }

    /// The hidden, zero-sized selection.
    pub fn hidden() -> Self {
        Self::default()
    }
}

impl RegionShape for Selection {
    fn bounds(&self) -> Rect {
        self.rect.as_rect()
    }
}
