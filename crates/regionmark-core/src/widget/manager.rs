//! Focus binding: decides which shape owns the resize handles.

use super::handles::{Handle, HandleKind, hit_test_handles, rect_handles};
use super::state::Focus;
use crate::camera::Viewport;
use crate::canvas::ShapeStore;
use crate::shapes::{RegionShape, ShapeRef};
use kurbo::{Point, Rect};

/// Tracks the single shape bound to resize handles.
///
/// Holds only a [`ShapeRef`]; geometry is looked up in the store by id each
/// time it is needed, so a deleted marker simply yields no handles.
#[derive(Debug, Clone, Default)]
pub struct FocusBinding {
    /// Shape currently owning the handles.
    owner: Option<ShapeRef>,
    /// Focus seen on the last sync.
    last_focus: Focus,
    /// Selection visibility seen on the last sync.
    last_selection_visible: bool,
}

impl FocusBinding {
    /// Create an unbound focus binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the handle owner if focus or selection visibility changed.
    ///
    /// Returns true when the owner changed.
    pub fn sync(&mut self, store: &ShapeStore) -> bool {
        let focus = store.focus();
        let selection_visible = store.selection().visible;
        if focus == self.last_focus && selection_visible == self.last_selection_visible {
            return false;
        }
        self.last_focus = focus;
        self.last_selection_visible = selection_visible;

        let owner = Self::resolve(store);
        if owner == self.owner {
            return false;
        }
        log::debug!("Handle owner: {:?} -> {:?}", self.owner, owner);
        self.owner = owner;
        true
    }

    /// The focused marker if any, else the visible selection, else nothing.
    fn resolve(store: &ShapeStore) -> Option<ShapeRef> {
        if let Some(id) = store.focused_marker() {
            if store.marker(id).is_some() {
                return Some(ShapeRef::Marker(id.clone()));
            }
        }
        if store.selection().visible {
            return Some(ShapeRef::Selection);
        }
        None
    }

    /// The shape owning the handles.
    pub fn owner(&self) -> Option<&ShapeRef> {
        self.owner.as_ref()
    }

    /// Image-space bounds of the handle owner.
    pub fn owner_bounds(&self, store: &ShapeStore) -> Option<Rect> {
        match self.owner.as_ref()? {
            ShapeRef::Marker(id) => store.marker(id).map(|m| m.bounds()),
            ShapeRef::Selection => Some(store.selection().bounds()),
        }
    }

    /// Handles of the owner in screen space.
    pub fn handles(&self, store: &ShapeStore, viewport: &Viewport) -> Vec<Handle> {
        self.owner_bounds(store)
            .map(|bounds| rect_handles(viewport.rect_to_screen(bounds)))
            .unwrap_or_default()
    }

    /// Find the owner's handle under a screen point.
    pub fn hit_test(
        &self,
        store: &ShapeStore,
        viewport: &Viewport,
        screen_point: Point,
        tolerance: f64,
    ) -> Option<(ShapeRef, HandleKind)> {
        let owner = self.owner.clone()?;
        let bounds = viewport.rect_to_screen(self.owner_bounds(store)?);
        hit_test_handles(bounds, screen_point, tolerance).map(|kind| (owner, kind))
    }
}
