//! Engine façade: wires viewport, store, gestures, focus binding and sync.

use crate::camera::Viewport;
use crate::canvas::ShapeStore;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::gesture::{CursorHint, GestureContext, GestureRouter, InteractionState};
use crate::input::InputEvent;
use crate::shapes::{Marker, MarkerId, MarkerPatch, Rectangle, Selection, ShapeRef};
use crate::sync::{SelectionMode, SyncBridge};
use crate::widget::{Focus, FocusBinding, Handle};
use kurbo::Size;

/// Change reported to the owner of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The selection geometry changed or was cleared.
    ///
    /// `is_new_selection` is only true on the draw path.
    SelectionChanged {
        rect: Rectangle,
        visible: bool,
        is_new_selection: bool,
    },
    /// A click changed marker focus.
    MarkerSelected(Option<MarkerId>),
    /// A move or resize of a marker was committed (image space).
    MarkerMoved { id: MarkerId, rect: Rectangle },
}

impl Notification {
    /// Deliver this notification to an observer.
    pub fn dispatch(&self, observer: &mut impl EngineObserver) {
        match self {
            Notification::SelectionChanged {
                rect,
                visible,
                is_new_selection,
            } => observer.on_selection_change(*rect, *visible, *is_new_selection),
            Notification::MarkerSelected(id) => observer.on_marker_select(id.as_ref()),
            Notification::MarkerMoved { id, rect } => {
                observer.on_marker_move(id, rect.x, rect.y, rect.width, rect.height)
            }
        }
    }
}

/// Receives engine notifications. All methods default to doing nothing.
pub trait EngineObserver {
    fn on_selection_change(&mut self, _rect: Rectangle, _visible: bool, _is_new_selection: bool) {}
    fn on_marker_select(&mut self, _id: Option<&MarkerId>) {}
    fn on_marker_move(&mut self, _id: &MarkerId, _x: f64, _y: f64, _width: f64, _height: f64) {}
}

/// Deliver a batch of notifications in order.
pub fn dispatch_all(notifications: &[Notification], observer: &mut impl EngineObserver) {
    for notification in notifications {
        notification.dispatch(observer);
    }
}

/// Result of promoting the selection to a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub id: MarkerId,
    pub notifications: Vec<Notification>,
}

/// The interactive viewport and shape-manipulation engine.
///
/// Handlers run to completion and return their notifications; the engine is
/// consistent by the time the caller sees them, so observers may call back
/// into the mutation API.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    /// `None` until an image is loaded.
    viewport: Option<Viewport>,
    image_size: Option<Size>,
    store: ShapeStore,
    binding: FocusBinding,
    router: GestureRouter,
    bridge: SyncBridge,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with no image loaded.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: ShapeStore::with_undo_limit(config.undo_limit),
            config,
            viewport: None,
            image_size: None,
            binding: FocusBinding::new(),
            router: GestureRouter::new(),
            bridge: SyncBridge::default(),
        }
    }

    /// Create an engine whose selection is owned by the host.
    pub fn controlled(config: EngineConfig) -> Self {
        let mut engine = Self::new(config);
        engine.bridge.set_mode(SelectionMode::Controlled);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.bridge.mode()
    }

    /// Load a bitmap of the given intrinsic size into a drawing surface.
    ///
    /// Resets the viewport to scale 1.0 with the bitmap centred, aborts any
    /// gesture and hides the selection. Markers are kept.
    pub fn load_image(&mut self, width: f64, height: f64, surface: Size) -> Vec<Notification> {
        let image = Size::new(width, height);
        let mut viewport = Viewport::with_config(&self.config);
        viewport.center_image(image, surface);
        log::info!(
            "Loaded {}x{} image, origin {:?}",
            width,
            height,
            viewport.origin
        );
        self.viewport = Some(viewport);
        self.image_size = Some(image);
        self.router.reset();

        let mut out = Vec::new();
        if self.store.selection().visible {
            self.store.clear_selection();
            out.push(Self::cleared_selection(&self.store));
        }
        self.binding.sync(&self.store);
        out
    }

    /// Intrinsic size of the loaded image.
    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        self.viewport.as_mut()
    }

    /// Process one input event.
    ///
    /// Pointer and wheel events before an image is loaded are ignored.
    pub fn handle_event(&mut self, event: impl Into<InputEvent>) -> Vec<Notification> {
        let event = event.into();
        let Some(viewport) = self.viewport.as_mut() else {
            if let InputEvent::Key(key) = &event {
                self.router.track_key(key);
            }
            return Vec::new();
        };
        let mut ctx = GestureContext {
            viewport,
            store: &mut self.store,
            binding: &self.binding,
            config: &self.config,
        };
        let out = self.router.handle(&mut ctx, &event);
        self.binding.sync(&self.store);
        out
    }

    /// Feed an external selection value (controlled mode).
    ///
    /// Never produces notifications. Returns whether internal state changed.
    pub fn sync_selection(&mut self, external: Option<Selection>) -> bool {
        let internal = *self.store.selection();
        let reconciliation = self.bridge.reconcile(external.as_ref(), &internal);
        if !reconciliation.is_change() {
            return false;
        }
        let next = reconciliation.apply(internal);
        log::debug!("External selection sync: {:?}", reconciliation);
        if self.is_editing_selection() {
            // The host overrode the shape under the pointer.
            self.router.reset();
        }
        self.store.set_selection(next.rect, next.visible);
        self.binding.sync(&self.store);
        true
    }

    /// Promote the visible selection to a marker and clear the selection.
    pub fn commit_selection(&mut self, label: impl Into<String>) -> Option<Committed> {
        let selection = *self.store.selection();
        if !selection.visible {
            return None;
        }
        if self.is_editing_selection() {
            self.router.reset();
        }
        let id = self.store.create_marker(selection.rect, label);
        self.store.clear_selection();
        self.binding.sync(&self.store);
        Some(Committed {
            id,
            notifications: vec![Self::cleared_selection(&self.store)],
        })
    }

    /// Whether a gesture is drawing, moving or resizing the selection.
    fn is_editing_selection(&self) -> bool {
        matches!(self.router.state(), InteractionState::DrawingSelection { .. })
            || self.router.state().target() == Some(&ShapeRef::Selection)
    }

    fn cleared_selection(store: &ShapeStore) -> Notification {
        let selection = store.selection();
        Notification::SelectionChanged {
            rect: selection.rect,
            visible: selection.visible,
            is_new_selection: false,
        }
    }

    /// Create a marker directly (e.g. from an editing form).
    pub fn create_marker(&mut self, rect: Rectangle, label: impl Into<String>) -> MarkerId {
        let id = self.store.create_marker(rect, label);
        self.binding.sync(&self.store);
        id
    }

    /// Merge fields into a marker.
    pub fn update_marker(&mut self, id: &MarkerId, patch: &MarkerPatch) -> Result<()> {
        self.store.update_marker(id, patch)
    }

    /// Delete a marker, dropping focus if it was focused.
    pub fn delete_marker(&mut self, id: &MarkerId) -> Result<Marker> {
        let removed = self.store.delete_marker(id)?;
        self.binding.sync(&self.store);
        Ok(removed)
    }

    /// Replace the marker collection with the owner's copy.
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.store.set_markers(markers);
        self.binding.sync(&self.store);
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.store.undo();
        self.binding.sync(&self.store);
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.store.redo();
        self.binding.sync(&self.store);
        changed
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.store.markers()
    }

    pub fn selection(&self) -> &Selection {
        self.store.selection()
    }

    pub fn focus(&self) -> Focus {
        self.store.focus()
    }

    pub fn interaction(&self) -> &InteractionState {
        self.router.state()
    }

    pub fn cursor(&self) -> CursorHint {
        self.router.cursor()
    }

    /// Shape currently owning the resize handles.
    pub fn handle_owner(&self) -> Option<&ShapeRef> {
        self.binding.owner()
    }

    /// Resize handles of the focused shape, in screen space.
    pub fn handles(&self) -> Vec<Handle> {
        match &self.viewport {
            Some(viewport) => self.binding.handles(&self.store, viewport),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
    use crate::widget::HandleKind;
    use kurbo::{Point, Vec2};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Engine with an 800x600 image filling an 800x600 surface: scale 1, origin (0, 0).
    fn loaded() -> Engine {
        init_logging();
        let mut engine = Engine::default();
        engine.load_image(800.0, 600.0, Size::new(800.0, 600.0));
        engine
    }

    fn down(x: f64, y: f64, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers,
        }
    }

    fn moved(x: f64, y: f64, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
            modifiers,
        }
    }

    fn up(x: f64, y: f64, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers,
        }
    }

    fn wheel(delta_y: f64, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Scroll {
            position: Point::ZERO,
            delta: Vec2::new(0.0, delta_y),
            modifiers,
        }
    }

    /// Run a full gesture and collect every notification.
    fn drag(
        engine: &mut Engine,
        from: (f64, f64),
        to: (f64, f64),
        modifiers: Modifiers,
    ) -> Vec<Notification> {
        let mut out = engine.handle_event(down(from.0, from.1, modifiers));
        out.extend(engine.handle_event(moved(to.0, to.1, modifiers)));
        out.extend(engine.handle_event(up(to.0, to.1, modifiers)));
        out
    }

    fn click(engine: &mut Engine, x: f64, y: f64) -> Vec<Notification> {
        let mut out = engine.handle_event(down(x, y, Modifiers::NONE));
        out.extend(engine.handle_event(up(x, y, Modifiers::NONE)));
        out
    }

    fn assert_exclusive(engine: &Engine) {
        assert!(
            !(engine.selection().visible && engine.focus().is_marker()),
            "selection visible while a marker is focused"
        );
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl EngineObserver for Recorder {
        fn on_selection_change(&mut self, rect: Rectangle, visible: bool, is_new: bool) {
            self.calls.push(format!(
                "selection {} {} {} {} {} {}",
                rect.x, rect.y, rect.width, rect.height, visible, is_new
            ));
        }

        fn on_marker_select(&mut self, id: Option<&MarkerId>) {
            self.calls.push(format!("select {:?}", id.map(|id| id.as_str().to_string())));
        }

        fn on_marker_move(&mut self, id: &MarkerId, x: f64, y: f64, width: f64, height: f64) {
            self.calls.push(format!("move {} {} {} {} {}", id, x, y, width, height));
        }
    }

    #[test]
    fn test_draw_then_commit() {
        let mut engine = loaded();
        let out = drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);

        let expected = Rectangle::new(10.0, 10.0, 50.0, 30.0);
        assert_eq!(
            out.last(),
            Some(&Notification::SelectionChanged {
                rect: expected,
                visible: true,
                is_new_selection: true,
            })
        );
        assert!(engine.interaction().is_idle());
        assert_eq!(engine.selection().rect, expected);
        assert_eq!(engine.handle_owner(), Some(&ShapeRef::Selection));

        let committed = engine.commit_selection("A").unwrap();
        let marker = engine.store().marker(&committed.id).unwrap();
        assert_eq!(marker.rect, expected);
        assert_eq!(marker.label, "A");
        assert!(!engine.selection().visible);
        assert_eq!(
            committed.notifications,
            vec![Notification::SelectionChanged {
                rect: Rectangle::default(),
                visible: false,
                is_new_selection: false,
            }]
        );
    }

    #[test]
    fn test_draw_start_notifies_zero_size_selection() {
        let mut engine = loaded();
        let out = engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        assert_eq!(
            out,
            vec![Notification::SelectionChanged {
                rect: Rectangle::new(10.0, 10.0, 0.0, 0.0),
                visible: true,
                is_new_selection: true,
            }]
        );
        assert!(matches!(engine.interaction(), InteractionState::DrawingSelection { .. }));
        assert_eq!(engine.cursor(), CursorHint::Crosshair);
    }

    #[test]
    fn test_draw_backwards_normalizes() {
        let mut engine = loaded();
        drag(&mut engine, (60.0, 40.0), (10.0, 10.0), Modifiers::ALT);
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn test_draw_respects_viewport() {
        let mut engine = loaded();
        {
            let viewport = engine.viewport_mut().unwrap();
            viewport.origin = Vec2::new(100.0, 50.0);
            viewport.scale = 2.0;
        }
        drag(&mut engine, (120.0, 70.0), (220.0, 130.0), Modifiers::ALT);
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn test_commit_without_selection() {
        let mut engine = loaded();
        assert!(engine.commit_selection("A").is_none());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_marker_click_clears_selection() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);

        let out = click(&mut engine, 120.0, 120.0);
        assert_eq!(
            out,
            vec![
                Notification::SelectionChanged {
                    rect: Rectangle::default(),
                    visible: false,
                    is_new_selection: false,
                },
                Notification::MarkerSelected(Some(id.clone())),
            ]
        );
        assert_eq!(engine.focus(), Focus::Marker(id.clone()));
        assert_eq!(engine.handle_owner(), Some(&ShapeRef::Marker(id)));

        let mut recorder = Recorder::default();
        dispatch_all(&out, &mut recorder);
        assert_eq!(recorder.calls.len(), 2);
        assert!(recorder.calls[0].ends_with("false false"));
        assert!(recorder.calls[1].starts_with("select Some"));
    }

    #[test]
    fn test_click_toggles_focus() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");

        assert_eq!(click(&mut engine, 140.0, 110.0), vec![Notification::MarkerSelected(Some(id))]);
        assert_eq!(click(&mut engine, 140.0, 110.0), vec![Notification::MarkerSelected(None)]);
        assert_eq!(engine.focus(), Focus::None);
        assert!(engine.handle_owner().is_none());
    }

    #[test]
    fn test_click_picks_topmost_marker() {
        let mut engine = loaded();
        engine.create_marker(Rectangle::new(0.0, 0.0, 100.0, 100.0), "back");
        let front = engine.create_marker(Rectangle::new(50.0, 50.0, 100.0, 100.0), "front");
        let out = click(&mut engine, 75.0, 75.0);
        assert_eq!(out, vec![Notification::MarkerSelected(Some(front))]);
    }

    #[test]
    fn test_background_click_is_noop() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        click(&mut engine, 120.0, 120.0);
        assert!(click(&mut engine, 500.0, 500.0).is_empty());
        assert_eq!(engine.focus(), Focus::Marker(id));
    }

    #[test]
    fn test_draw_clears_marker_focus() {
        let mut engine = loaded();
        engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        click(&mut engine, 120.0, 120.0);
        assert!(engine.focus().is_marker());

        engine.handle_event(down(300.0, 300.0, Modifiers::ALT));
        assert_eq!(engine.focus(), Focus::Selection);
        assert_exclusive(&engine);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut engine = loaded();
        engine.viewport_mut().unwrap().scale = 4.8;
        for _ in 0..6 {
            assert!(engine.handle_event(wheel(-1.0, Modifiers::CTRL)).is_empty());
        }
        assert!((engine.viewport().unwrap().scale - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wheel_without_ctrl_ignored() {
        let mut engine = loaded();
        engine.handle_event(wheel(-1.0, Modifiers::NONE));
        assert!((engine.viewport().unwrap().scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_bound_under_repeated_wheel() {
        let mut engine = loaded();
        for i in 0..300 {
            let sign = if (i / 40) % 2 == 0 { -1.0 } else { 1.0 };
            engine.handle_event(wheel(sign, Modifiers::CTRL));
            let scale = engine.viewport().unwrap().scale;
            assert!((0.1..=5.0).contains(&scale));
        }
    }

    #[test]
    fn test_space_drag_pans() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        let selection_before = *engine.selection();

        engine.handle_event(KeyEvent::Pressed(Key::Space));
        assert_eq!(engine.cursor(), CursorHint::Grab);
        engine.handle_event(down(500.0, 500.0, Modifiers::NONE));
        assert_eq!(engine.cursor(), CursorHint::Grabbing);
        engine.handle_event(moved(520.0, 510.0, Modifiers::NONE));
        engine.handle_event(moved(600.0, 550.0, Modifiers::NONE));
        engine.handle_event(up(600.0, 550.0, Modifiers::NONE));

        assert_eq!(engine.viewport().unwrap().origin, Vec2::new(100.0, 50.0));
        let rect = engine.store().marker(&id).unwrap().rect;
        assert_eq!(rect, Rectangle::new(100.0, 100.0, 50.0, 50.0));
        assert_eq!(*engine.selection(), selection_before);
        assert!(engine.interaction().is_idle());
    }

    #[test]
    fn test_space_release_ends_pan() {
        let mut engine = loaded();
        engine.handle_event(KeyEvent::Pressed(Key::Space));
        engine.handle_event(down(500.0, 500.0, Modifiers::NONE));
        engine.handle_event(KeyEvent::Released(Key::Space));
        assert!(engine.interaction().is_idle());

        engine.handle_event(moved(550.0, 550.0, Modifiers::NONE));
        assert_eq!(engine.viewport().unwrap().origin, Vec2::ZERO);
    }

    #[test]
    fn test_alt_release_freezes_selection() {
        let mut engine = loaded();
        engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        engine.handle_event(moved(60.0, 40.0, Modifiers::ALT));
        engine.handle_event(KeyEvent::Released(Key::Alt));
        assert!(engine.interaction().is_idle());

        assert!(engine.handle_event(moved(200.0, 200.0, Modifiers::NONE)).is_empty());
        assert!(engine.handle_event(up(200.0, 200.0, Modifiers::NONE)).is_empty());
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
        assert!(engine.selection().visible);
    }

    #[test]
    fn test_move_without_alt_modifier_freezes_draw() {
        let mut engine = loaded();
        engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        engine.handle_event(moved(60.0, 40.0, Modifiers::ALT));
        assert!(engine.handle_event(moved(90.0, 90.0, Modifiers::NONE)).is_empty());
        assert!(engine.interaction().is_idle());
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn test_drag_without_ctrl_does_nothing() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        let out = drag(&mut engine, (120.0, 120.0), (170.0, 150.0), Modifiers::NONE);
        assert!(out.is_empty());
        assert!(engine.interaction().is_idle());
        let rect = engine.store().marker(&id).unwrap().rect;
        assert_eq!(rect, Rectangle::new(100.0, 100.0, 50.0, 50.0));
    }

    #[test]
    fn test_ctrl_drag_moves_marker_in_image_space() {
        let mut engine = loaded();
        engine.viewport_mut().unwrap().scale = 2.0;
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");

        engine.handle_event(down(250.0, 250.0, Modifiers::CTRL));
        assert_eq!(engine.cursor(), CursorHint::Move);
        let mut out = engine.handle_event(moved(260.0, 240.0, Modifiers::CTRL));
        out.extend(engine.handle_event(moved(270.0, 230.0, Modifiers::CTRL)));
        assert!(out.is_empty());
        out.extend(engine.handle_event(up(270.0, 230.0, Modifiers::CTRL)));

        let expected = Rectangle::new(110.0, 90.0, 50.0, 50.0);
        assert_eq!(out, vec![Notification::MarkerMoved { id: id.clone(), rect: expected }]);
        assert_eq!(engine.store().marker(&id).unwrap().rect, expected);
    }

    #[test]
    fn test_ctrl_drag_moves_selection() {
        let mut engine = loaded();
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        let out = drag(&mut engine, (30.0, 20.0), (40.0, 50.0), Modifiers::CTRL);
        let expected = Rectangle::new(20.0, 40.0, 50.0, 30.0);
        assert_eq!(
            out,
            vec![Notification::SelectionChanged {
                rect: expected,
                visible: true,
                is_new_selection: false,
            }]
        );
        assert_eq!(engine.selection().rect, expected);
    }

    #[test]
    fn test_ctrl_release_cancels_move() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        engine.handle_event(down(120.0, 120.0, Modifiers::CTRL));
        engine.handle_event(moved(160.0, 160.0, Modifiers::CTRL));
        engine.handle_event(KeyEvent::Released(Key::Control));
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(up(160.0, 160.0, Modifiers::NONE)).is_empty());
        let rect = engine.store().marker(&id).unwrap().rect;
        assert_eq!(rect, Rectangle::new(100.0, 100.0, 50.0, 50.0));
    }

    #[test]
    fn test_ctrl_click_focuses_marker() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        engine.handle_event(down(120.0, 120.0, Modifiers::CTRL));
        let out = engine.handle_event(up(120.0, 120.0, Modifiers::CTRL));
        assert_eq!(out, vec![Notification::MarkerSelected(Some(id))]);
    }

    #[test]
    fn test_move_of_deleted_marker_is_silent() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        engine.handle_event(down(120.0, 120.0, Modifiers::CTRL));
        engine.handle_event(moved(160.0, 160.0, Modifiers::CTRL));
        engine.delete_marker(&id).unwrap();
        assert!(engine.handle_event(up(160.0, 160.0, Modifiers::CTRL)).is_empty());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_resize_selection() {
        let mut engine = loaded();
        engine.viewport_mut().unwrap().scale = 2.0;
        // Image (10, 10, 50, 30) is screen (20, 20)-(120, 80).
        drag(&mut engine, (20.0, 20.0), (120.0, 80.0), Modifiers::ALT);
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));

        engine.handle_event(down(120.0, 80.0, Modifiers::NONE));
        assert_eq!(engine.cursor(), CursorHint::Resize(HandleKind::BottomRight));
        let mut out = engine.handle_event(moved(140.0, 100.0, Modifiers::NONE));
        out.extend(engine.handle_event(up(140.0, 100.0, Modifiers::NONE)));

        let expected = Rectangle::new(10.0, 10.0, 60.0, 40.0);
        assert_eq!(
            out,
            vec![Notification::SelectionChanged {
                rect: expected,
                visible: true,
                is_new_selection: false,
            }]
        );
    }

    #[test]
    fn test_resize_below_minimum_keeps_geometry() {
        let mut engine = loaded();
        engine.viewport_mut().unwrap().scale = 2.0;
        drag(&mut engine, (20.0, 20.0), (120.0, 80.0), Modifiers::ALT);
        let before = *engine.selection();

        // 8 screen px is below 5 * scale = 10.
        let out = drag(&mut engine, (120.0, 80.0), (28.0, 80.0), Modifiers::NONE);
        assert!(out.is_empty());
        assert_eq!(*engine.selection(), before);
    }

    #[test]
    fn test_resize_marker_reports_move() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        click(&mut engine, 120.0, 120.0);

        let out = drag(&mut engine, (100.0, 125.0), (90.0, 140.0), Modifiers::NONE);
        let expected = Rectangle::new(90.0, 100.0, 60.0, 50.0);
        assert_eq!(out, vec![Notification::MarkerMoved { id: id.clone(), rect: expected }]);
        assert_eq!(engine.focus(), Focus::Marker(id));
    }

    #[test]
    fn test_escape_reverts_resize() {
        let mut engine = loaded();
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        engine.handle_event(down(60.0, 40.0, Modifiers::NONE));
        engine.handle_event(moved(90.0, 90.0, Modifiers::NONE));
        engine.handle_event(KeyEvent::Pressed(Key::Escape));
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(up(90.0, 90.0, Modifiers::NONE)).is_empty());
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn test_events_before_load_are_ignored() {
        init_logging();
        let mut engine = Engine::default();
        assert!(engine.handle_event(down(10.0, 10.0, Modifiers::ALT)).is_empty());
        assert!(engine.handle_event(up(60.0, 40.0, Modifiers::ALT)).is_empty());
        assert!(!engine.selection().visible);
        assert!(engine.handles().is_empty());
    }

    #[test]
    fn test_load_image_centres_and_hides_selection() {
        let mut engine = loaded();
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        engine.viewport_mut().unwrap().scale = 3.0;

        let out = engine.load_image(200.0, 100.0, Size::new(800.0, 600.0));
        assert_eq!(out.len(), 1);
        assert!(!engine.selection().visible);
        let viewport = engine.viewport().unwrap();
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(viewport.origin, Vec2::new(300.0, 250.0));
        assert_eq!(engine.image_size(), Some(Size::new(200.0, 100.0)));
    }

    #[test]
    fn test_controlled_sync() {
        init_logging();
        let mut engine = Engine::controlled(EngineConfig::default());
        engine.load_image(800.0, 600.0, Size::new(800.0, 600.0));
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        click(&mut engine, 120.0, 120.0);

        let external = Selection::new(Rectangle::new(1.0, 2.0, 3.0, 4.0), true);
        assert!(engine.sync_selection(Some(external)));
        assert_eq!(*engine.selection(), external);
        assert_exclusive(&engine);
        assert_ne!(engine.focus(), Focus::Marker(id));

        assert!(!engine.sync_selection(Some(external)));
        assert!(engine.sync_selection(None));
        assert!(!engine.selection().visible);
        assert!(!engine.sync_selection(None));
    }

    #[test]
    fn test_controlled_echo_does_not_loop() {
        init_logging();
        let mut engine = Engine::controlled(EngineConfig::default());
        engine.load_image(800.0, 600.0, Size::new(800.0, 600.0));
        let out = drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        let Some(Notification::SelectionChanged { rect, visible, .. }) = out.last().cloned() else {
            panic!("expected a selection change");
        };
        // The host echoes the value back.
        assert!(!engine.sync_selection(Some(Selection::new(rect, visible))));
    }

    #[test]
    fn test_uncontrolled_ignores_sync() {
        let mut engine = loaded();
        drag(&mut engine, (10.0, 10.0), (60.0, 40.0), Modifiers::ALT);
        assert!(!engine.sync_selection(None));
        assert!(engine.selection().visible);
    }

    struct Reentrant<'a> {
        engine: &'a mut Engine,
    }

    impl EngineObserver for Reentrant<'_> {
        fn on_marker_move(&mut self, id: &MarkerId, _x: f64, _y: f64, _width: f64, _height: f64) {
            self.engine.delete_marker(id).unwrap();
        }

        fn on_marker_select(&mut self, id: Option<&MarkerId>) {
            if let Some(id) = id {
                self.engine.update_marker(id, &MarkerPatch::label("seen")).unwrap();
            }
        }
    }

    #[test]
    fn test_observer_may_reenter() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");

        let out = click(&mut engine, 120.0, 120.0);
        dispatch_all(&out, &mut Reentrant { engine: &mut engine });
        assert_eq!(engine.store().marker(&id).unwrap().label, "seen");

        let out = drag(&mut engine, (120.0, 120.0), (140.0, 140.0), Modifiers::CTRL);
        dispatch_all(&out, &mut Reentrant { engine: &mut engine });
        assert!(engine.store().is_empty());
        assert_eq!(engine.focus(), Focus::None);
        assert!(engine.handle_owner().is_none());
    }

    #[test]
    fn test_mutual_exclusivity_under_random_input() {
        let mut engine = loaded();
        for i in 0..4 {
            let offset = i as f64 * 120.0;
            engine.create_marker(Rectangle::new(offset, offset, 80.0, 80.0), format!("m{i}"));
        }

        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..2000 {
            let roll = next();
            let x = (next() % 600) as f64;
            let y = (next() % 600) as f64;
            let modifiers = match roll % 4 {
                0 => Modifiers::ALT,
                1 => Modifiers::CTRL,
                _ => Modifiers::NONE,
            };
            match (roll >> 8) % 9 {
                0 | 1 => {
                    engine.handle_event(down(x, y, modifiers));
                }
                2 | 3 => {
                    engine.handle_event(moved(x, y, modifiers));
                }
                4 | 5 => {
                    engine.handle_event(up(x, y, modifiers));
                }
                6 => {
                    engine.handle_event(KeyEvent::Released(Key::Alt));
                }
                7 => {
                    engine.commit_selection("auto");
                }
                _ => {
                    let sign = if roll % 2 == 0 { -1.0 } else { 1.0 };
                    engine.handle_event(wheel(sign, Modifiers::CTRL));
                }
            }
            assert_exclusive(&engine);
            let selection = engine.selection().rect;
            assert!(selection.width >= 0.0 && selection.height >= 0.0);
            let scale = engine.viewport().unwrap().scale;
            assert!((0.1..=5.0).contains(&scale));
        }
    }

    fn controlled_loaded() -> Engine {
        init_logging();
        let mut engine = Engine::controlled(EngineConfig::default());
        engine.load_image(800.0, 600.0, Size::new(800.0, 600.0));
        engine
    }

    #[test]
    fn test_external_selection_with_negative_size_is_normalized() {
        let mut engine = controlled_loaded();
        let external = Selection {
            rect: Rectangle {
                x: 50.0,
                y: 50.0,
                width: -40.0,
                height: 20.0,
            },
            visible: true,
        };
        assert!(engine.sync_selection(Some(external)));
        assert_eq!(engine.selection().rect, Rectangle::new(10.0, 50.0, 40.0, 20.0));
        assert!(!engine.sync_selection(Some(external)));
    }

    #[test]
    fn test_owner_markers_with_negative_size_are_clickable() {
        let mut engine = loaded();
        let markers: Vec<Marker> = serde_json::from_str(
            r#"[{ "id": "m1", "x": 100, "y": 100, "width": -50, "height": 40, "label": "A" }]"#,
        )
        .unwrap();
        engine.set_markers(markers);

        let id = MarkerId::from("m1");
        let rect = engine.store().marker(&id).unwrap().rect;
        assert_eq!(rect, Rectangle::new(50.0, 100.0, 50.0, 40.0));
        assert_eq!(
            click(&mut engine, 75.0, 120.0),
            vec![Notification::MarkerSelected(Some(id))]
        );
    }

    #[test]
    fn test_external_sync_aborts_selection_gestures() {
        let mut engine = controlled_loaded();

        // Drawing.
        engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        engine.handle_event(moved(60.0, 40.0, Modifiers::ALT));
        let first = Selection::new(Rectangle::new(200.0, 200.0, 40.0, 40.0), true);
        assert!(engine.sync_selection(Some(first)));
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(moved(90.0, 90.0, Modifiers::ALT)).is_empty());
        assert!(engine.handle_event(up(90.0, 90.0, Modifiers::ALT)).is_empty());
        assert_eq!(*engine.selection(), first);

        // Moving.
        engine.handle_event(down(210.0, 210.0, Modifiers::CTRL));
        assert!(matches!(engine.interaction(), InteractionState::MovingShape(_)));
        engine.handle_event(moved(230.0, 230.0, Modifiers::CTRL));
        let second = Selection::new(Rectangle::new(300.0, 300.0, 40.0, 40.0), true);
        assert!(engine.sync_selection(Some(second)));
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(up(230.0, 230.0, Modifiers::CTRL)).is_empty());
        assert_eq!(*engine.selection(), second);

        // Resizing from the bottom-right handle at (340, 340).
        engine.handle_event(down(340.0, 340.0, Modifiers::NONE));
        assert!(matches!(engine.interaction(), InteractionState::ResizingShape(_)));
        engine.handle_event(moved(360.0, 360.0, Modifiers::NONE));
        let third = Selection::new(Rectangle::new(300.0, 300.0, 20.0, 20.0), true);
        assert!(engine.sync_selection(Some(third)));
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(up(360.0, 360.0, Modifiers::NONE)).is_empty());
        assert_eq!(*engine.selection(), third);
    }

    #[test]
    fn test_commit_selection_mid_draw_ends_gesture() {
        let mut engine = loaded();
        engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        engine.handle_event(moved(60.0, 40.0, Modifiers::ALT));

        let committed = engine.commit_selection("A").unwrap();
        assert!(engine.interaction().is_idle());
        assert!(engine.handle_event(moved(100.0, 100.0, Modifiers::ALT)).is_empty());
        assert!(engine.handle_event(up(100.0, 100.0, Modifiers::ALT)).is_empty());

        assert!(!engine.selection().visible);
        assert_eq!(engine.store().len(), 1);
        let rect = engine.store().marker(&committed.id).unwrap().rect;
        assert_eq!(rect, Rectangle::new(10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn test_escape_stops_pan() {
        let mut engine = loaded();
        engine.handle_event(KeyEvent::Pressed(Key::Space));
        engine.handle_event(down(500.0, 500.0, Modifiers::NONE));
        engine.handle_event(moved(520.0, 510.0, Modifiers::NONE));
        engine.handle_event(KeyEvent::Pressed(Key::Escape));
        assert!(engine.interaction().is_idle());
        assert_eq!(engine.cursor(), CursorHint::Grab);

        engine.handle_event(moved(600.0, 600.0, Modifiers::NONE));
        assert_eq!(engine.viewport().unwrap().origin, Vec2::new(20.0, 10.0));
    }

    #[test]
    fn test_escape_freezes_draw() {
        let mut engine = loaded();
        engine.handle_event(down(10.0, 10.0, Modifiers::ALT));
        engine.handle_event(moved(60.0, 40.0, Modifiers::ALT));
        assert!(engine.handle_event(KeyEvent::Pressed(Key::Escape)).is_empty());
        assert!(engine.interaction().is_idle());

        assert!(engine.handle_event(moved(100.0, 100.0, Modifiers::ALT)).is_empty());
        assert!(engine.handle_event(up(100.0, 100.0, Modifiers::ALT)).is_empty());
        assert_eq!(
            *engine.selection(),
            Selection::new(Rectangle::new(10.0, 10.0, 50.0, 30.0), true)
        );
    }

    #[test]
    fn test_config_reaches_viewport_and_history() {
        init_logging();
        let config = EngineConfig {
            min_scale: 0.5,
            max_scale: 2.0,
            undo_limit: 1,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config);
        engine.load_image(800.0, 600.0, Size::new(800.0, 600.0));

        for _ in 0..20 {
            engine.handle_event(wheel(-1.0, Modifiers::CTRL));
        }
        assert!((engine.viewport().unwrap().scale - 2.0).abs() < f64::EPSILON);
        for _ in 0..40 {
            engine.handle_event(wheel(1.0, Modifiers::CTRL));
        }
        assert!((engine.viewport().unwrap().scale - 0.5).abs() < f64::EPSILON);

        engine.create_marker(Rectangle::new(0.0, 0.0, 10.0, 10.0), "A");
        engine.create_marker(Rectangle::new(20.0, 0.0, 10.0, 10.0), "B");
        assert!(engine.undo());
        assert!(!engine.undo());
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_handles_follow_focus_in_screen_space() {
        let mut engine = loaded();
        assert!(engine.handles().is_empty());

        {
            let viewport = engine.viewport_mut().unwrap();
            viewport.origin = Vec2::new(5.0, 5.0);
            viewport.scale = 2.0;
        }
        engine.create_marker(Rectangle::new(10.0, 10.0, 20.0, 20.0), "M");
        click(&mut engine, 45.0, 45.0);

        let handles = engine.handles();
        assert_eq!(handles.len(), 8);
        let corner = handles
            .iter()
            .find(|handle| handle.kind == HandleKind::BottomRight)
            .unwrap();
        assert_eq!(corner.position, Point::new(65.0, 65.0));
    }

    #[test]
    fn test_undo_through_engine_rebinds_focus() {
        let mut engine = loaded();
        let id = engine.create_marker(Rectangle::new(100.0, 100.0, 50.0, 50.0), "M");
        click(&mut engine, 120.0, 120.0);
        assert_eq!(engine.handle_owner(), Some(&ShapeRef::Marker(id.clone())));

        assert!(engine.undo());
        assert!(engine.handle_owner().is_none());
        assert!(engine.redo());
        assert!(engine.store().marker(&id).is_some());
    }
}
