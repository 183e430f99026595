//! Persisted, named region markers.

use super::{Rectangle, RegionShape};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique identifier of a marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// View the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MarkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named rectangular annotation over the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: MarkerId,
    /// Geometry in image space.
    #[serde(flatten)]
    pub rect: Rectangle,
    /// User-facing name.
    pub label: String,
    /// Recognized text for this region, filled in by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

impl Marker {
    /// Create a marker with a freshly generated id.
    pub fn new(rect: Rectangle, label: impl Into<String>) -> Self {
        Self::with_id(MarkerId::generate(), rect, label)
    }

    /// Create a marker with a caller-supplied id. The geometry is normalized.
    pub fn with_id(id: MarkerId, rect: Rectangle, label: impl Into<String>) -> Self {
        Self {
            id,
            rect: rect.normalized(),
            label: label.into(),
            ocr_text: None,
        }
    }

    /// Merge a patch into this marker.
    pub fn apply(&mut self, patch: &MarkerPatch) {
        let x = patch.x.unwrap_or(self.rect.x);
        let y = patch.y.unwrap_or(self.rect.y);
        let width = patch.width.unwrap_or(self.rect.width);
        let height = patch.height.unwrap_or(self.rect.height);
        self.rect = Rectangle::new(x, y, width, height);
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(ocr_text) = &patch.ocr_text {
            self.ocr_text = Some(ocr_text.clone());
        }
    }
}

impl RegionShape for Marker {
    fn bounds(&self) -> Rect {
        self.rect.as_rect()
    }
}

/// Partial update for a marker. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub label: Option<String>,
    pub ocr_text: Option<String>,
}

impl MarkerPatch {
    /// Patch replacing the whole geometry.
    pub fn geometry(rect: Rectangle) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    /// Patch replacing only the label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}
