//! ShareShot Core Library
//!
//! This library provides the capture-and-selection core of the ShareShot
//! screenshot tool: multi-monitor compositing, the interactive selection
//! overlay, cropping and delivery to save/clipboard/share sinks.
//!
//! # Overview
//!
//! A capture cycle runs entirely on the calling thread:
//!
//! - **Screen Capture**: every display is composited into one frame via [`capture`]
//! - **Selection**: a full-screen overlay drives a rectangle state machine via [`ui`]
//! - **Cropping**: the committed rectangle is cut out via [`image_processing`]
//! - **Delivery**: the result goes to the configured [`sink`]s
//!
//! [`coordinator`] ties these together and guarantees that at most one cycle
//! runs at a time.
//!
//! # Quick Start
//!
//! ```ignore
//! use shareshot_core::{notify::LogNotifier, sink::ClipboardMode, ShareShot};
//!
//! let app = ShareShot::new()?;
//! let mut coordinator = app.coordinator(Box::new(LogNotifier), None, ClipboardMode::HandOff)?;
//! coordinator.start_cycle();
//! coordinator.finish();
//! ```
//!
//! # Module Structure
//!
//! - [`capture`]: Display enumeration and compositing
//! - [`config`]: Configuration loading and management
//! - [`coordinator`]: Capture cycle orchestration and the single-flight guard
//! - [`error`]: Error types and result aliases
//! - [`geometry`]: Points and rectangles
//! - [`image_processing`]: Cropping and encoding
//! - [`notify`]: User-visible notices
//! - [`settings`]: Persisted user settings
//! - [`sink`]: Save, clipboard and share sinks
//! - [`ui`]: The selection overlay

pub mod capture;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod image_processing;
pub mod notify;
pub mod settings;
pub mod sink;
pub mod ui;

// Re-export primary types for convenience
pub use capture::{DisplayCompositor, ScreenSource};
pub use config::Config;
pub use coordinator::{CaptureCoordinator, CycleOutcome};
pub use error::{AppError, Result};

use notify::Notifier;
use sink::{ClipboardMode, ClipboardSink, SaveSink, ShareHandler, ShareSink};
use ui::OverlaySurface;

/// The production coordinator: `screenshots` displays, eframe overlay.
pub type DesktopCoordinator = CaptureCoordinator<ScreenSource, OverlaySurface>;

/// Main entry point for the ShareShot application.
///
/// This struct wires the configured sinks, the real display source and the
/// overlay into a [`CaptureCoordinator`].
pub struct ShareShot {
    config: Config,
}

impl ShareShot {
    /// Creates a new instance from the environment and the settings file.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self { config })
    }

    /// Creates an instance with custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Lists available monitors with their bounds.
    pub fn list_monitors(&self) -> Result<Vec<String>> {
        Ok(DisplayCompositor::new(ScreenSource).list_displays()?)
    }

    /// Builds the coordinator for this configuration.
    ///
    /// Sinks are registered as save, then clipboard (if enabled), then share
    /// (if enabled and `share_handler` is given). Short-lived callers pass
    /// [`ClipboardMode::HandOff`] and call
    /// [`CaptureCoordinator::finish`] before exiting.
    ///
    /// # Errors
    ///
    /// Returns an error if no save folder can be resolved, or if sharing is
    /// enabled without a client id.
    pub fn coordinator(
        &self,
        notifier: Box<dyn Notifier>,
        share_handler: Option<Box<dyn ShareHandler>>,
        clipboard: ClipboardMode,
    ) -> Result<DesktopCoordinator> {
        let save = match &self.config.save_dir {
            Some(dir) => SaveSink::new(dir),
            None => SaveSink::in_pictures()?,
        };
        log::debug!("Saving captures to {}", save.folder().display());

        let mut coordinator = CaptureCoordinator::new(
            DisplayCompositor::new(ScreenSource),
            OverlaySurface::new(self.config.overlay.clone()),
            notifier,
        )
        .with_sink(Box::new(save));

        if self.config.copy_to_clipboard {
            coordinator = coordinator.with_sink(Box::new(ClipboardSink::new(clipboard)));
        }

        if self.config.share_enabled {
            let credential = self.config.client_id.clone().ok_or_else(|| {
                AppError::config("sharing is enabled but no client id is configured")
            })?;
            match share_handler {
                Some(handler) => {
                    coordinator = coordinator.with_sink(Box::new(ShareSink::new(credential, handler)));
                }
                None => log::warn!("Sharing is enabled but no share handler was provided"),
            }
        }

        Ok(coordinator)
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
