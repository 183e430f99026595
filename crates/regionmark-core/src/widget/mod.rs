//! Focus and handle system.
//!
//! - Focus state: which marker (or the selection) the user is working on
//! - Focus binding: which shape owns the resize handles
//! - Handle geometry and hit testing
//!
//! Shapes remain pure data in the store. The binding refers to them by id.

mod handles;
mod manager;
mod state;

pub use handles::{Handle, HandleKind, hit_test_handles, rect_handles};
pub use manager::FocusBinding;
pub use state::Focus;
