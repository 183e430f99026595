//! Focus state definitions.

use crate::shapes::MarkerId;
use serde::{Deserialize, Serialize};

/// Which shape currently has the user's focus.
///
/// At most one of a focused marker and a visible selection exists at a time,
/// so a single enum covers every case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Focus {
    /// Nothing focused.
    #[default]
    None,
    /// A marker was clicked.
    Marker(MarkerId),
    /// The visible selection.
    Selection,
}

impl Focus {
    /// Check if a marker is focused.
    pub fn is_marker(&self) -> bool {
        matches!(self, Focus::Marker(_))
    }
}
