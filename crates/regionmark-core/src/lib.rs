//! RegionMark Core Library
//!
//! Platform-agnostic viewport and shape-manipulation engine for marking
//! rectangular regions on a bitmap. The host feeds pointer, wheel and key
//! events into an [`Engine`] and renders from its state; the engine reports
//! changes back as [`Notification`] values.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod input;
pub mod selection;
pub mod shapes;
pub mod sync;
pub mod widget;

pub use camera::Viewport;
pub use canvas::ShapeStore;
pub use config::EngineConfig;
pub use engine::{Committed, Engine, EngineObserver, Notification, dispatch_all};
pub use error::{ConfigError, EngineError};
pub use gesture::{CursorHint, GestureRouter, InteractionState};
pub use input::{InputEvent, InputState, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use selection::ManipulationState;
pub use shapes::{Marker, MarkerId, MarkerPatch, Rectangle, RegionShape, Selection, ShapeRef};
pub use sync::{Reconciliation, SelectionMode, SyncBridge};
pub use widget::{Focus, FocusBinding, Handle, HandleKind};
