//! Selection state machine types and input events.

use crate::geometry::{Point, Rect};

/// Lifecycle of one selection session.
///
/// `Idle -> Armed -> Dragging -> {Committed | Cancelled}`; `Armed` may also go
/// straight to a terminal state on pointer-up or cancel. The terminal states
/// never change again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Overlay shown, nothing selected yet.
    Idle,
    /// Primary button pressed, pointer has not moved yet.
    Armed,
    /// Pointer moved with the primary button held.
    Dragging,
    /// Selection accepted.
    Committed(Rect),
    /// Selection discarded.
    Cancelled(CancelReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed(_) | Self::Cancelled(_))
    }
}

/// Why a session ended without a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The user pressed the cancel key.
    UserCancelled,
    /// The pointer was released on a rectangle at or below the minimum size.
    TooSmall { width: u32, height: u32 },
    /// The overlay went away before the session resolved.
    OverlayClosed,
}

/// Final outcome of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Committed(Rect),
    Cancelled(CancelReason),
}

/// Pointer buttons the session distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Input delivered to a session, in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerDown { at: Point, button: PointerButton },
    PointerMove { at: Point },
    PointerUp { at: Point, button: PointerButton },
    Cancel,
}
