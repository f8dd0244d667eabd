//! Error types for the shareshot-core library.
//!
//! Failures are split by the stage that produces them so the capture
//! coordinator can decide how far a failure reaches:
//!
//! - [`CaptureError`] aborts the current capture cycle only.
//! - [`SinkError`] is reported to the user but never stops the other sinks.
//! - [`AppError`] wraps both, plus the failures of non-cycle operations
//!   (overlay start-up, configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Failures while enumerating or reading the physical displays.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The display list was empty.
    #[error("No displays detected")]
    NoDisplays,

    /// The platform refused to enumerate displays.
    #[error("Failed to enumerate displays: {0}")]
    Enumerate(String),

    /// Reading the pixels of one display failed.
    #[error("Failed to capture {display}: {reason}")]
    Display { display: String, reason: String },

    /// The composite buffer could not be allocated or assembled.
    #[error("Failed to build frame buffer: {0}")]
    Buffer(String),
}

impl CaptureError {
    /// Creates a per-display capture error.
    pub fn display(display: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Display {
            display: display.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a frame buffer error with the given message.
    pub fn buffer(msg: impl Into<String>) -> Self {
        Self::Buffer(msg.into())
    }
}

/// Failures of downstream sinks (save, clipboard, share).
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing the image file failed.
    #[error("Failed to save screenshot to {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    /// Neither a pictures directory nor a home directory could be resolved.
    #[error("No pictures directory available")]
    NoPicturesDir,

    /// The system clipboard could not be opened or written.
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    /// Encoding the image for a sink failed.
    #[error("Image encoding failed: {0}")]
    Encode(String),

    /// The external share handler reported a failure.
    #[error("Share failed: {0}")]
    Share(String),
}

impl SinkError {
    /// Creates a save error for the given path.
    pub fn save(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Save {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a clipboard error with the given message.
    pub fn clipboard(msg: impl std::fmt::Display) -> Self {
        Self::Clipboard(msg.to_string())
    }

    /// Creates a share error with the given message.
    pub fn share(msg: impl Into<String>) -> Self {
        Self::Share(msg.into())
    }
}

/// Errors that can occur within the shareshot-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (invalid values, inconsistent options).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Display enumeration or capture failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A sink failed to deliver the final image.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The selection is empty or falls outside the captured frame.
    #[error("Selection area is empty or invalid")]
    InvalidSelection,

    /// UI-related errors (overlay start-up, window management).
    #[error("UI error: {0}")]
    Ui(String),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
