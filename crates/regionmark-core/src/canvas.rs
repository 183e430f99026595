//! Shape store: the marker collection, the transient selection, and focus.

use crate::error::{EngineError, Result};
use crate::shapes::{Marker, MarkerId, MarkerPatch, Rectangle, RegionShape, Selection};
use crate::widget::Focus;
use kurbo::Point;
use std::collections::HashMap;

/// Default number of undo states to keep.
pub const DEFAULT_UNDO_LIMIT: usize = 50;

/// A snapshot of the marker collection for undo/redo.
#[derive(Debug, Clone)]
struct MarkerSnapshot {
    markers: HashMap<MarkerId, Marker>,
    order: Vec<MarkerId>,
}

/// Owns the markers (an arena indexed by id), the single selection and the
/// focused marker.
///
/// Every mutation keeps `selection.visible` and a focused marker mutually
/// exclusive.
#[derive(Debug, Clone)]
pub struct ShapeStore {
    /// Markers keyed by id.
    markers: HashMap<MarkerId, Marker>,
    /// Creation order (back to front).
    order: Vec<MarkerId>,
    /// The transient selection.
    selection: Selection,
    /// Marker currently bound to resize handles.
    focused: Option<MarkerId>,
    undo_stack: Vec<MarkerSnapshot>,
    redo_stack: Vec<MarkerSnapshot>,
    undo_limit: usize,
}

impl Default for ShapeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_undo_limit(DEFAULT_UNDO_LIMIT)
    }

    /// Create an empty store keeping at most `undo_limit` undo states.
    pub fn with_undo_limit(undo_limit: usize) -> Self {
        Self {
            markers: HashMap::new(),
            order: Vec::new(),
            selection: Selection::hidden(),
            focused: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            undo_limit,
        }
    }

    fn snapshot(&self) -> MarkerSnapshot {
        MarkerSnapshot {
            markers: self.markers.clone(),
            order: self.order.clone(),
        }
    }

    fn restore(&mut self, snapshot: MarkerSnapshot) {
        self.markers = snapshot.markers;
        self.order = snapshot.order;
        if let Some(id) = &self.focused {
            if !self.markers.contains_key(id) {
                self.focused = None;
            }
        }
    }

    /// Push current state to the undo stack (call before making changes).
    fn push_undo(&mut self) {
        if self.undo_limit == 0 {
            return;
        }
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.undo_limit {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last marker change. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(snapshot) => {
                let current = self.snapshot();
                self.redo_stack.push(current);
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(snapshot) => {
                let current = self.snapshot();
                self.undo_stack.push(current);
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Create a marker with a fresh id and append it on top.
    pub fn create_marker(&mut self, rect: Rectangle, label: impl Into<String>) -> MarkerId {
        self.push_undo();
        let marker = Marker::new(rect, label);
        let id = marker.id.clone();
        log::debug!("Created marker {} at {:?}", id, marker.rect);
        self.order.push(id.clone());
        self.markers.insert(id.clone(), marker);
        id
    }

    /// Merge a patch into an existing marker.
    pub fn update_marker(&mut self, id: &MarkerId, patch: &MarkerPatch) -> Result<()> {
        if !self.markers.contains_key(id) {
            return Err(EngineError::MarkerNotFound(id.clone()));
        }
        self.push_undo();
        if let Some(marker) = self.markers.get_mut(id) {
            marker.apply(patch);
        }
        Ok(())
    }

    /// Remove a marker, clearing focus if it was focused.
    pub fn delete_marker(&mut self, id: &MarkerId) -> Result<Marker> {
        if !self.markers.contains_key(id) {
            return Err(EngineError::MarkerNotFound(id.clone()));
        }
        self.push_undo();
        self.order.retain(|other| other != id);
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
        }
        self.markers
            .remove(id)
            .ok_or_else(|| EngineError::MarkerNotFound(id.clone()))
    }

    /// Replace the whole collection with markers supplied by the owner.
    ///
    /// Focus survives only if the focused id is still present. Not undoable.
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers.clear();
        self.order.clear();
        for mut marker in markers {
            marker.rect = marker.rect.normalized();
            if !self.markers.contains_key(&marker.id) {
                self.order.push(marker.id.clone());
            }
            self.markers.insert(marker.id.clone(), marker);
        }
        if let Some(id) = &self.focused {
            if !self.markers.contains_key(id) {
                self.focused = None;
            }
        }
    }

    /// Get a marker by id.
    pub fn marker(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Markers back to front.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    /// Markers under a point (image coordinates), front to back.
    pub fn markers_at_point(&self, point: Point, tolerance: f64) -> Vec<MarkerId> {
        self.order
            .iter()
            .rev()
            .filter(|id| {
                self.markers
                    .get(*id)
                    .is_some_and(|m| m.hit_test(point, tolerance))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection. A visible selection drops marker focus first.
    ///
    /// Negative sizes are normalized before storing.
    pub fn set_selection(&mut self, rect: Rectangle, visible: bool) {
        if visible {
            self.focused = None;
        }
        self.selection = Selection::new(rect.normalized(), visible);
    }

    /// Hide the selection and zero its geometry.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::hidden();
    }

    /// The focused marker id, if any.
    pub fn focused_marker(&self) -> Option<&MarkerId> {
        self.focused.as_ref()
    }

    /// Current focus: a marker, the visible selection, or nothing.
    pub fn focus(&self) -> Focus {
        match &self.focused {
            Some(id) => Focus::Marker(id.clone()),
            None if self.selection.visible => Focus::Selection,
            None => Focus::None,
        }
    }

    /// Focus a marker. The selection is hidden first.
    pub fn focus_marker(&mut self, id: &MarkerId) -> Result<()> {
        if !self.markers.contains_key(id) {
            return Err(EngineError::MarkerNotFound(id.clone()));
        }
        self.selection.visible = false;
        self.focused = Some(id.clone());
        Ok(())
    }

    /// Drop marker focus.
    pub fn clear_focus(&mut self) {
        self.focused = None;
    }
}
