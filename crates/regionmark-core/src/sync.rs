//! Reconciliation of an externally owned selection with the internal one.
//!
//! The sync path only flows inward: reconciling never produces a
//! notification, so a host that echoes notifications back as external
//! updates cannot start a feedback loop.

use crate::shapes::Selection;
use serde::{Deserialize, Serialize};

/// Who owns the active selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// The engine owns the selection; external updates are ignored.
    #[default]
    Uncontrolled,
    /// The host owns the selection and pushes it in on every change.
    Controlled,
}

/// Outcome of reconciling one external update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// Internal state already agrees.
    Unchanged,
    /// Overwrite the internal selection with this value.
    Replace(Selection),
    /// Hide the internal selection.
    Hide,
}

impl Reconciliation {
    /// Apply to an internal selection, returning the new internal state.
    pub fn apply(self, internal: Selection) -> Selection {
        match self {
            Reconciliation::Unchanged => internal,
            Reconciliation::Replace(selection) => selection,
            Reconciliation::Hide => Selection {
                visible: false,
                ..internal
            },
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Reconciliation::Unchanged)
    }
}

/// Decide how an external selection update affects the internal selection.
///
/// A supplied value is normalized first; if it then differs field-wise it
/// replaces the internal state. An absent value hides a visible internal
/// selection. Idempotent: reconciling the result again yields
/// [`Reconciliation::Unchanged`].
pub fn reconcile(external: Option<&Selection>, internal: &Selection) -> Reconciliation {
    let external = external.map(|selection| Selection::new(selection.rect, selection.visible));
    match external {
        Some(external) if external != *internal => Reconciliation::Replace(external),
        Some(_) => Reconciliation::Unchanged,
        None if internal.visible => Reconciliation::Hide,
        None => Reconciliation::Unchanged,
    }
}

/// Applies external selection updates according to the selection mode.
#[derive(Debug, Clone, Default)]
pub struct SyncBridge {
    mode: SelectionMode,
}

impl SyncBridge {
    pub fn new(mode: SelectionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Reconcile one external update. Uncontrolled bridges never change anything.
    pub fn reconcile(&self, external: Option<&Selection>, internal: &Selection) -> Reconciliation {
        match self.mode {
            SelectionMode::Uncontrolled => Reconciliation::Unchanged,
            SelectionMode::Controlled => reconcile(external, internal),
        }
    }
}
