//! User interface components for shareshot.
//!
//! This module provides the full-screen selection overlay that lets the user
//! drag a rectangle over a captured frame.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: Session states, outcomes and input events
//! - [`selection`]: The selection state machine
//! - [`rendering`]: Veil, cutout, border and coordinate mapping
//! - [`overlay`]: The eframe window hosting a session
//!
//! # Usage
//!
//! ```ignore
//! use shareshot_core::ui::{OverlayStyle, OverlaySurface, SelectionSession, SelectionSurface};
//!
//! let mut surface = OverlaySurface::new(OverlayStyle::default());
//! let session = surface.run(SelectionSession::new(frame))?;
//! let (resolution, frame) = session.finish();
//! ```

mod overlay;
mod rendering;
mod selection;
mod state;

// Public API exports
pub use overlay::OverlaySurface;
pub use rendering::FrameMapping;
pub use selection::{is_valid_selection, SelectionSession, MIN_SELECTION_SIZE};
pub use state::{CancelReason, PointerButton, Resolution, SelectionEvent, SessionState};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Visual parameters of the overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Veil darkness (0-255, higher = darker).
    pub veil_alpha: u8,
    /// Selection border width in UI points.
    pub border_width: f32,
    /// Selection border colour as RGB.
    pub border_color: [u8; 3],
    /// Show the `W × H` label next to the selection.
    pub show_size_label: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            veil_alpha: 150,
            border_width: 2.0,
            border_color: [255, 0, 0],
            show_size_label: true,
        }
    }
}

/// Something that can host a [`SelectionSession`] until it resolves.
///
/// Implementations feed user input into the session and return it once it
/// reaches a terminal state. A session returned unresolved is treated as
/// cancelled by [`SelectionSession::finish`].
pub trait SelectionSurface {
    fn run(&mut self, session: SelectionSession) -> Result<SelectionSession>;
}
