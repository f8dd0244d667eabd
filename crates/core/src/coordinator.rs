//! Capture cycle orchestration.
//!
//! One cycle is: acquire the guard, compose the displays, run a selection
//! session, crop, release the frame and the guard, then feed the sinks.
//!
//! The guard is an RAII token. Dropping it clears the in-progress flag, so
//! every exit path out of [`CaptureCoordinator::start_cycle`] (success,
//! cancellation, error or an unwinding panic) leaves capture available.

use crate::capture::{DisplayCompositor, DisplaySource};
use crate::error::{AppError, SinkError};
use crate::image_processing::ImageProcessor;
use crate::notify::{Notice, Notifier};
use crate::sink::{Delivery, ImageSink};
use crate::ui::{Resolution, SelectionSession, SelectionSurface};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide single-flight flag for capture cycles.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CaptureCycleGuard {
    active: Arc<AtomicBool>,
}

impl CaptureCycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a cycle as active, unless one already is.
    pub fn try_acquire(&self) -> Option<CycleToken> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleToken {
                active: Arc::clone(&self.active),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the current cycle. Clears the guard on drop.
#[derive(Debug)]
pub struct CycleToken {
    active: Arc<AtomicBool>,
}

impl Drop for CycleToken {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Result of one [`CaptureCoordinator::start_cycle`] call.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Another cycle was already running; nothing was done.
    Busy,
    /// The user cancelled or the selection was too small.
    Cancelled,
    /// Capture or overlay start-up failed.
    Failed(AppError),
    /// A selection was cropped and handed to the sinks.
    Completed(CycleReport),
}

/// What happened to a committed capture.
#[derive(Debug)]
pub struct CycleReport {
    pub width: u32,
    pub height: u32,
    /// When the guard was cleared, before any sink ran.
    pub released_at: Instant,
    pub deliveries: Vec<Delivery>,
    pub failures: Vec<(&'static str, SinkError)>,
}

/// Runs capture cycles against a display source, a selection surface and a
/// list of sinks.
pub struct CaptureCoordinator<S, U> {
    compositor: DisplayCompositor<S>,
    surface: U,
    sinks: Vec<Box<dyn ImageSink>>,
    notifier: Box<dyn Notifier>,
    guard: CaptureCycleGuard,
}

impl<S: DisplaySource, U: SelectionSurface> CaptureCoordinator<S, U> {
    pub fn new(compositor: DisplayCompositor<S>, surface: U, notifier: Box<dyn Notifier>) -> Self {
        Self {
            compositor,
            surface,
            sinks: Vec::new(),
            notifier,
            guard: CaptureCycleGuard::new(),
        }
    }

    /// Appends a sink. Sinks run in registration order.
    pub fn with_sink(mut self, sink: Box<dyn ImageSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Shares this coordinator's guard with the caller.
    pub fn guard(&self) -> CaptureCycleGuard {
        self.guard.clone()
    }

    /// Whether a sink still needs the process alive to serve a delivery.
    pub fn has_pending_deliveries(&self) -> bool {
        self.sinks.iter().any(|sink| sink.pending())
    }

    /// Waits for every sink to release its earlier deliveries.
    pub fn finish(&mut self) {
        for sink in &mut self.sinks {
            sink.finish();
        }
    }

    /// Runs one full capture cycle, unless one is already in progress.
    pub fn start_cycle(&mut self) -> CycleOutcome {
        let Some(token) = self.guard.try_acquire() else {
            log::warn!("Capture requested while another capture is in progress");
            self.notifier.notify(&Notice::info(
                "Capture in progress",
                "Finish or cancel the current selection first.",
            ));
            return CycleOutcome::Busy;
        };

        log::info!("Capture cycle started");
        let outcome = self.run_cycle(token);
        match &outcome {
            CycleOutcome::Completed(report) => log::info!(
                "Capture cycle completed: {}x{}, {} delivered, {} failed",
                report.width,
                report.height,
                report.deliveries.len(),
                report.failures.len()
            ),
            CycleOutcome::Cancelled => log::info!("Capture cycle cancelled"),
            CycleOutcome::Failed(e) => log::error!("Capture cycle failed: {}", e),
            CycleOutcome::Busy => {}
        }
        outcome
    }

    /// Everything after the guard is held. `token` is dropped before the
    /// sinks run.
    fn run_cycle(&mut self, token: CycleToken) -> CycleOutcome {
        let frame = match self.compositor.capture() {
            Ok(frame) => frame,
            Err(e) => {
                self.notifier
                    .notify(&Notice::error("Error capturing screen", e.to_string()));
                return CycleOutcome::Failed(e.into());
            }
        };

        let session = match self.surface.run(SelectionSession::new(frame)) {
            Ok(session) => session,
            Err(e) => {
                self.notifier
                    .notify(&Notice::error("Error showing selection overlay", e.to_string()));
                return CycleOutcome::Failed(e);
            }
        };

        let (resolution, frame) = session.finish();
        let rect = match resolution {
            Resolution::Committed(rect) => rect,
            Resolution::Cancelled(reason) => {
                log::debug!("Selection cancelled: {:?}", reason);
                return CycleOutcome::Cancelled;
            }
        };

        let cropped = ImageProcessor::crop(&frame, rect);
        drop(frame);
        drop(token);
        let released_at = Instant::now();

        let image = match cropped {
            Ok(image) => image,
            Err(AppError::InvalidSelection) => return CycleOutcome::Cancelled,
            Err(e) => {
                self.notifier
                    .notify(&Notice::error("Error cropping screenshot", e.to_string()));
                return CycleOutcome::Failed(e);
            }
        };

        let mut report = CycleReport {
            width: image.width(),
            height: image.height(),
            released_at,
            deliveries: Vec::new(),
            failures: Vec::new(),
        };

        for sink in &mut self.sinks {
            match sink.deliver(&image) {
                Ok(delivery) => {
                    log::info!("{} sink: {}", delivery.sink, delivery.message);
                    report.deliveries.push(delivery);
                }
                Err(e) => {
                    log::warn!("{} sink failed: {}", sink.name(), e);
                    self.notifier
                        .notify(&Notice::warning("Screenshot not delivered", e.to_string()));
                    report.failures.push((sink.name(), e));
                }
            }
        }

        if !report.deliveries.is_empty() {
            let body = report
                .deliveries
                .iter()
                .map(|d| d.message.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            self.notifier.notify(&Notice::info("Screenshot taken", body));
        }

        CycleOutcome::Completed(report)
    }
}
