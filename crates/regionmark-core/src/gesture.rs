//! Gesture router: turns raw input into pan, draw, move and resize gestures.
//!
//! Every input goes through [`GestureRouter::handle`], which dispatches on
//! the current [`InteractionState`], the event kind, the held modifiers and
//! the shape under the pointer.

use crate::camera::Viewport;
use crate::canvas::ShapeStore;
use crate::config::EngineConfig;
use crate::engine::Notification;
use crate::input::{InputEvent, InputState, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::selection::ManipulationState;
use crate::shapes::{MarkerPatch, Rectangle, RegionShape, ShapeRef};
use crate::widget::{FocusBinding, HandleKind};
use kurbo::Point;

/// What the user is currently doing. Exactly one is active at a time.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning,
    /// Drawing a fresh selection from `anchor` (image space).
    DrawingSelection { anchor: Point },
    MovingShape(ManipulationState),
    ResizingShape(ManipulationState),
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    /// The shape a move or resize is working on.
    pub fn target(&self) -> Option<&ShapeRef> {
        match self {
            InteractionState::MovingShape(m) | InteractionState::ResizingShape(m) => {
                Some(&m.target)
            }
            _ => None,
        }
    }
}

/// Cursor the host should show. The engine never touches the host cursor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    /// Space held, ready to pan.
    Grab,
    /// Panning in progress.
    Grabbing,
    /// Alt held or drawing.
    Crosshair,
    Move,
    Resize(HandleKind),
}

/// What lies under the pointer at press time.
#[derive(Debug, Clone, PartialEq)]
enum HitTarget {
    Background,
    Shape(ShapeRef),
    Handle(ShapeRef, HandleKind),
}

/// A press on a shape that becomes a click if released in place.
#[derive(Debug, Clone)]
struct PendingClick {
    target: ShapeRef,
    press: Point,
}

/// Mutable view of the engine state a gesture works on.
pub struct GestureContext<'a> {
    pub viewport: &'a mut Viewport,
    pub store: &'a mut ShapeStore,
    pub binding: &'a FocusBinding,
    pub config: &'a EngineConfig,
}

/// State machine classifying input into gestures.
#[derive(Debug, Clone, Default)]
pub struct GestureRouter {
    state: InteractionState,
    input: InputState,
    pending_click: Option<PendingClick>,
}

impl GestureRouter {
    /// Create an idle router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current interaction state.
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Tracked input (held keys, pointer position).
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Record a key without dispatching it (used before an image is loaded).
    pub fn track_key(&mut self, event: &KeyEvent) {
        self.input.handle_key_event(event);
    }

    /// Abort whatever gesture is running without committing anything.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.pending_click = None;
    }

    /// Cursor for the current state and held keys.
    pub fn cursor(&self) -> CursorHint {
        match &self.state {
            InteractionState::Panning => CursorHint::Grabbing,
            InteractionState::DrawingSelection { .. } => CursorHint::Crosshair,
            InteractionState::MovingShape(_) => CursorHint::Move,
            InteractionState::ResizingShape(m) => match m.handle {
                Some(kind) => CursorHint::Resize(kind),
                None => CursorHint::Move,
            },
            InteractionState::Idle if self.input.is_space_held() => CursorHint::Grab,
            InteractionState::Idle if self.input.is_alt_held() => CursorHint::Crosshair,
            InteractionState::Idle => CursorHint::Default,
        }
    }

    /// Dispatch one input event.
    pub fn handle(
        &mut self,
        ctx: &mut GestureContext<'_>,
        event: &InputEvent,
    ) -> Vec<Notification> {
        let mut out = Vec::new();
        match event {
            InputEvent::Pointer(pointer) => {
                self.input.handle_pointer_event(pointer);
                match pointer {
                    PointerEvent::Down { position, button, modifiers } => {
                        self.pointer_down(ctx, *position, *button, *modifiers, &mut out)
                    }
                    PointerEvent::Move { position, modifiers } => {
                        self.pointer_move(ctx, *position, *modifiers, &mut out)
                    }
                    PointerEvent::Up { position, button, .. } => {
                        self.pointer_up(ctx, *position, *button, &mut out)
                    }
                    PointerEvent::Scroll { delta, modifiers, .. } => {
                        if modifiers.ctrl {
                            ctx.viewport.zoom(delta.y);
                            log::debug!("Zoom to {:.3}", ctx.viewport.scale);
                        }
                    }
                }
            }
            InputEvent::Key(key) => {
                self.input.handle_key_event(key);
                self.key(key);
            }
        }
        out
    }

    fn hit_test(&self, ctx: &GestureContext<'_>, screen_point: Point) -> HitTarget {
        let tolerance = ctx.config.handle_hit_tolerance;
        let hit = ctx
            .binding
            .hit_test(&*ctx.store, &*ctx.viewport, screen_point, tolerance);
        if let Some((owner, kind)) = hit {
            return HitTarget::Handle(owner, kind);
        }
        let image_point = ctx.viewport.screen_to_image(screen_point);
        let selection = ctx.store.selection();
        if selection.visible && selection.hit_test(image_point, 0.0) {
            return HitTarget::Shape(ShapeRef::Selection);
        }
        match ctx.store.markers_at_point(image_point, 0.0).into_iter().next() {
            Some(id) => HitTarget::Shape(ShapeRef::Marker(id)),
            None => HitTarget::Background,
        }
    }

    /// Screen-space box of a shape, if it still exists.
    fn screen_bounds(ctx: &GestureContext<'_>, target: &ShapeRef) -> Option<kurbo::Rect> {
        let bounds = match target {
            ShapeRef::Marker(id) => ctx.store.marker(id)?.bounds(),
            ShapeRef::Selection => ctx.store.selection().bounds(),
        };
        Some(ctx.viewport.rect_to_screen(bounds))
    }

    fn pointer_down(
        &mut self,
        ctx: &mut GestureContext<'_>,
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
        out: &mut Vec<Notification>,
    ) {
        if !self.state.is_idle() || button != MouseButton::Left {
            return;
        }
        self.pending_click = None;

        match self.hit_test(ctx, position) {
            HitTarget::Handle(target, kind) => {
                if let Some(bounds) = Self::screen_bounds(ctx, &target) {
                    log::debug!("Resize {:?} via {:?}", target, kind);
                    self.state = InteractionState::ResizingShape(ManipulationState::new(
                        target,
                        Some(kind),
                        position,
                        bounds,
                    ));
                }
            }
            HitTarget::Shape(target) => {
                if modifiers.ctrl {
                    if let Some(bounds) = Self::screen_bounds(ctx, &target) {
                        log::debug!("Move {:?}", target);
                        self.state = InteractionState::MovingShape(ManipulationState::new(
                            target, None, position, bounds,
                        ));
                    }
                } else {
                    // Drag cancelled; a release in place is still a click.
                    self.pending_click = Some(PendingClick { target, press: position });
                }
            }
            HitTarget::Background => {
                if self.input.is_space_held() {
                    log::debug!("Pan start");
                    self.state = InteractionState::Panning;
                } else if modifiers.alt {
                    let anchor = ctx.viewport.screen_to_image(position);
                    let rect = Rectangle::from_corners(anchor, anchor);
                    ctx.store.set_selection(rect, true);
                    log::debug!("Draw selection from {:?}", anchor);
                    self.state = InteractionState::DrawingSelection { anchor };
                    out.push(Notification::SelectionChanged {
                        rect,
                        visible: true,
                        is_new_selection: true,
                    });
                }
            }
        }
    }

    fn pointer_move(
        &mut self,
        ctx: &mut GestureContext<'_>,
        position: Point,
        modifiers: Modifiers,
        out: &mut Vec<Notification>,
    ) {
        match &mut self.state {
            InteractionState::Panning => {
                ctx.viewport.pan(self.input.pointer_delta());
            }
            InteractionState::DrawingSelection { anchor } => {
                if !modifiers.alt {
                    log::debug!("Alt released mid-draw, freezing selection");
                    self.state = InteractionState::Idle;
                    return;
                }
                let current = ctx.viewport.screen_to_image(position);
                let rect = Rectangle::from_corners(*anchor, current);
                ctx.store.set_selection(rect, true);
                out.push(Notification::SelectionChanged {
                    rect,
                    visible: true,
                    is_new_selection: true,
                });
            }
            InteractionState::MovingShape(manipulation) => {
                if !modifiers.ctrl {
                    log::debug!("Ctrl released, move of {:?} cancelled", manipulation.target);
                    self.reset();
                    return;
                }
                manipulation.update(position, 0.0);
            }
            InteractionState::ResizingShape(manipulation) => {
                let min_size = ctx.config.min_resize_size * ctx.viewport.scale;
                manipulation.update(position, min_size);
            }
            InteractionState::Idle => {}
        }
    }

    fn pointer_up(
        &mut self,
        ctx: &mut GestureContext<'_>,
        position: Point,
        button: MouseButton,
        out: &mut Vec<Notification>,
    ) {
        if button != MouseButton::Left {
            return;
        }
        let tolerance = ctx.config.click_tolerance;
        let pending = self.pending_click.take();
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => {
                if let Some(click) = pending {
                    if (position - click.press).hypot() <= tolerance {
                        Self::click(ctx, &click.target, out);
                    }
                }
            }
            InteractionState::Panning => log::debug!("Pan end"),
            InteractionState::DrawingSelection { .. } => {
                log::debug!("Selection drawn: {:?}", ctx.store.selection().rect);
            }
            InteractionState::MovingShape(manipulation) => {
                if manipulation.has_moved(tolerance) {
                    Self::commit(ctx, &manipulation, out);
                } else {
                    Self::click(ctx, &manipulation.target, out);
                }
            }
            InteractionState::ResizingShape(manipulation) => {
                if manipulation.preview != manipulation.original {
                    Self::commit(ctx, &manipulation, out);
                }
            }
        }
    }

    fn key(&mut self, event: &KeyEvent) {
        let cancel = match (event, &self.state) {
            (KeyEvent::Released(Key::Alt), InteractionState::DrawingSelection { .. }) => true,
            (KeyEvent::Released(Key::Space), InteractionState::Panning) => true,
            (KeyEvent::Released(Key::Control), InteractionState::MovingShape(_)) => true,
            (KeyEvent::Pressed(Key::Escape), state) => !state.is_idle(),
            _ => false,
        };
        if cancel {
            log::debug!("{:?} ends {:?}", event, self.state);
            self.reset();
        }
    }

    /// Write a finished move/resize back into the store, in image space.
    fn commit(
        ctx: &mut GestureContext<'_>,
        manipulation: &ManipulationState,
        out: &mut Vec<Notification>,
    ) {
        let rect = manipulation.commit(ctx.viewport);
        match &manipulation.target {
            ShapeRef::Marker(id) => {
                match ctx.store.update_marker(id, &MarkerPatch::geometry(rect)) {
                    Ok(()) => {
                        log::debug!("Committed marker {} at {:?}", id, rect);
                        out.push(Notification::MarkerMoved { id: id.clone(), rect });
                    }
                    Err(err) => log::debug!("Dropped commit: {}", err),
                }
            }
            ShapeRef::Selection => {
                ctx.store.set_selection(rect, true);
                out.push(Notification::SelectionChanged {
                    rect,
                    visible: true,
                    is_new_selection: false,
                });
            }
        }
    }

    /// A press and release on a shape without a drag in between.
    fn click(ctx: &mut GestureContext<'_>, target: &ShapeRef, out: &mut Vec<Notification>) {
        let ShapeRef::Marker(id) = target else {
            return;
        };
        if ctx.store.focused_marker() == Some(id) {
            ctx.store.clear_focus();
            out.push(Notification::MarkerSelected(None));
            return;
        }
        if ctx.store.marker(id).is_none() {
            return;
        }
        if ctx.store.selection().visible {
            ctx.store.clear_selection();
            let cleared = ctx.store.selection();
            out.push(Notification::SelectionChanged {
                rect: cleared.rect,
                visible: false,
                is_new_selection: false,
            });
        }
        if ctx.store.focus_marker(id).is_ok() {
            out.push(Notification::MarkerSelected(Some(id.clone())));
        }
    }
}
