//! Interactive rectangle selection.
//!
//! [`SelectionSession`] is the state machine behind the overlay. It owns the
//! [`CapturedFrame`] for as long as the user is selecting and consumes
//! [`SelectionEvent`]s one at a time; the overlay only translates window input
//! into events and draws whatever [`SelectionSession::selection`] returns.

use super::state::{CancelReason, PointerButton, Resolution, SelectionEvent, SessionState};
use crate::capture::CapturedFrame;
use crate::geometry::{Point, Rect};

/// A selection must be strictly larger than this in both dimensions.
pub const MIN_SELECTION_SIZE: u32 = 10;

/// Whether a rectangle is large enough to commit.
pub fn is_valid_selection(rect: Rect) -> bool {
    rect.width > MIN_SELECTION_SIZE && rect.height > MIN_SELECTION_SIZE
}

/// One interactive selection over a captured frame.
#[derive(Debug)]
pub struct SelectionSession {
    frame: CapturedFrame,
    state: SessionState,
    anchor: Point,
    selection: Rect,
}

impl SelectionSession {
    /// Starts a session in [`SessionState::Idle`].
    pub fn new(frame: CapturedFrame) -> Self {
        Self {
            frame,
            state: SessionState::Idle,
            anchor: Point::default(),
            selection: Rect::default(),
        }
    }

    pub fn frame(&self) -> &CapturedFrame {
        &self.frame
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    /// The rectangle to preview, if the user has started selecting.
    pub fn selection(&self) -> Option<Rect> {
        match self.state {
            SessionState::Armed | SessionState::Dragging => Some(self.selection),
            SessionState::Committed(rect) => Some(rect),
            SessionState::Idle | SessionState::Cancelled(_) => None,
        }
    }

    /// The outcome, once the session is in a terminal state.
    pub fn resolution(&self) -> Option<Resolution> {
        match self.state {
            SessionState::Committed(rect) => Some(Resolution::Committed(rect)),
            SessionState::Cancelled(reason) => Some(Resolution::Cancelled(reason)),
            _ => None,
        }
    }

    /// Applies one input event. Returns `true` if the overlay must redraw.
    ///
    /// Events that make no sense in the current state (a move with no button
    /// held, anything after resolution) are ignored.
    pub fn handle(&mut self, event: SelectionEvent) -> bool {
        if self.is_resolved() {
            return false;
        }

        match (self.state, event) {
            (_, SelectionEvent::Cancel) => {
                self.cancel(CancelReason::UserCancelled);
                true
            }
            (
                SessionState::Idle,
                SelectionEvent::PointerDown {
                    at,
                    button: PointerButton::Primary,
                },
            ) => {
                let at = self.clamp(at);
                self.anchor = at;
                self.selection = Rect::from_corners(at, at);
                self.state = SessionState::Armed;
                true
            }
            (SessionState::Armed | SessionState::Dragging, SelectionEvent::PointerMove { at }) => {
                self.track(at);
                self.state = SessionState::Dragging;
                true
            }
            (
                SessionState::Armed | SessionState::Dragging,
                SelectionEvent::PointerUp {
                    at,
                    button: PointerButton::Primary,
                },
            ) => {
                self.track(at);
                self.state = if is_valid_selection(self.selection) {
                    SessionState::Committed(self.selection)
                } else {
                    SessionState::Cancelled(CancelReason::TooSmall {
                        width: self.selection.width,
                        height: self.selection.height,
                    })
                };
                true
            }
            _ => false,
        }
    }

    /// Cancels the session unless it is already resolved.
    pub fn cancel(&mut self, reason: CancelReason) {
        if !self.is_resolved() {
            self.selection = Rect::default();
            self.state = SessionState::Cancelled(reason);
        }
    }

    /// Tears the session down, handing back the frame.
    ///
    /// An unresolved session counts as cancelled because its overlay closed.
    pub fn finish(mut self) -> (Resolution, CapturedFrame) {
        self.cancel(CancelReason::OverlayClosed);
        let resolution = self
            .resolution()
            .unwrap_or(Resolution::Cancelled(CancelReason::OverlayClosed));
        (resolution, self.frame)
    }

    fn track(&mut self, at: Point) {
        let at = self.clamp(at);
        self.selection = Rect::from_corners(self.anchor, at);
    }

    fn clamp(&self, at: Point) -> Point {
        self.frame.local_rect().clamp_point(at)
    }
}
