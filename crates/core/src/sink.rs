//! Downstream consumers of the final cropped image.
//!
//! Every sink implements [`ImageSink`]. The coordinator calls them in the
//! order they were registered and keeps going when one fails.
//!
//! - [`SaveSink`] writes `ShareShot_<yyyyMMdd_HHmmss>.png` into a folder,
//!   `ShareShot` under the user's pictures directory by default.
//! - [`ClipboardSink`] places the image on the system clipboard, either
//!   from a long-lived handle or handed off to a holder thread.
//! - [`ShareSink`] encodes the image and hands it, with the configured client
//!   credential, to an external [`ShareHandler`] that owns all networking.

use crate::error::SinkError;
use crate::image_processing::ImageProcessor;
use arboard::{Clipboard, ImageData};
use chrono::{DateTime, Local};
use directories::UserDirs;
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// Name of the folder created under the pictures directory.
pub const FOLDER_NAME: &str = "ShareShot";

/// `chrono` format of saved file names.
pub const FILE_NAME_FORMAT: &str = "ShareShot_%Y%m%d_%H%M%S.png";

/// What a sink did with the image, for user-facing notices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub sink: &'static str,
    pub message: String,
}

/// A consumer of final images.
pub trait ImageSink {
    /// Short name used in logs and notices.
    fn name(&self) -> &'static str;

    /// Consumes one final image. Failures are reported, never retried.
    fn deliver(&mut self, image: &RgbaImage) -> Result<Delivery, SinkError>;

    /// Whether earlier deliveries still need the process to stay alive.
    fn pending(&self) -> bool {
        false
    }

    /// Blocks until earlier deliveries no longer need the process.
    fn finish(&mut self) {}
}

/// Saves images as PNG files.
#[derive(Clone, Debug)]
pub struct SaveSink {
    folder: PathBuf,
}

impl SaveSink {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Saves into `ShareShot` under the user's pictures directory.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NoPicturesDir`] if neither the pictures directory
    /// nor the home directory can be resolved.
    pub fn in_pictures() -> Result<Self, SinkError> {
        let user_dirs = UserDirs::new().ok_or(SinkError::NoPicturesDir)?;
        let pictures = user_dirs
            .picture_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| user_dirs.home_dir().join("Pictures"));
        Ok(Self::new(pictures.join(FOLDER_NAME)))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File name for a capture taken at `at`.
    pub fn file_name_at(at: DateTime<Local>) -> String {
        at.format(FILE_NAME_FORMAT).to_string()
    }

    /// First free path for `file_name`; later captures in the same second
    /// get a `_1`, `_2`... suffix.
    fn free_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.folder.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let stem = file_name.trim_end_matches(".png");
        (1..)
            .map(|n| self.folder.join(format!("{stem}_{n}.png")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }

    /// Writes `image` using the name for `at`.
    pub fn save_at(&self, image: &RgbaImage, at: DateTime<Local>) -> Result<PathBuf, SinkError> {
        fs::create_dir_all(&self.folder).map_err(|e| SinkError::save(&self.folder, e))?;

        let path = self.free_path(&Self::file_name_at(at));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| SinkError::save(&path, e))?;

        Ok(path)
    }
}

impl ImageSink for SaveSink {
    fn name(&self) -> &'static str {
        "save"
    }

    fn deliver(&mut self, image: &RgbaImage) -> Result<Delivery, SinkError> {
        let path = self.save_at(image, Local::now())?;
        log::info!("Screenshot saved to {}", path.display());
        Ok(Delivery {
            sink: self.name(),
            message: format!("Screenshot saved to {}", path.display()),
        })
    }
}

/// How long a copied image must outlive [`ImageSink::deliver`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipboardMode {
    /// The sink keeps its clipboard handle open for as long as it lives.
    /// Suits a long-running process such as the hotkey daemon.
    #[default]
    KeepAlive,
    /// On X11 and Wayland the image is served from a holder thread until
    /// another application replaces the clipboard contents, and
    /// [`ImageSink::finish`] blocks until then. Elsewhere the system keeps
    /// the image after exit and this behaves like `KeepAlive`.
    HandOff,
}

/// Places images on the system clipboard.
///
/// On X11 and Wayland clipboard contents are served by the owning process
/// and vanish when it exits; see [`ClipboardMode`].
#[derive(Default)]
pub struct ClipboardSink {
    mode: ClipboardMode,
    clipboard: Option<Clipboard>,
    holders: Vec<JoinHandle<()>>,
}

impl ClipboardSink {
    pub fn new(mode: ClipboardMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ClipboardMode {
        self.mode
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard, SinkError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().map_err(SinkError::clipboard)?);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| SinkError::clipboard("clipboard not initialised"))
    }

    fn copy_in_place(&mut self, image: &RgbaImage) -> Result<(), SinkError> {
        let data = ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        };
        let result = self.clipboard()?.set_image(data);
        if let Err(e) = result {
            // A broken connection stays broken; reconnect next time.
            self.clipboard = None;
            return Err(SinkError::clipboard(e));
        }
        Ok(())
    }

    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    ))]
    fn hand_off(&mut self, image: &RgbaImage) -> Result<(), SinkError> {
        use arboard::SetExtLinux;
        use std::sync::mpsc;

        let data = ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Owned(image.as_raw().clone()),
        };
        let (opened_tx, opened_rx) = mpsc::channel();

        let holder = std::thread::spawn(move || {
            let mut clipboard = match Clipboard::new() {
                Ok(clipboard) => {
                    let _ = opened_tx.send(Ok(()));
                    clipboard
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(SinkError::clipboard(e)));
                    return;
                }
            };
            // Returns once another application owns the clipboard.
            match clipboard.set().wait().image(data) {
                Ok(()) => log::debug!("Clipboard taken over by another application"),
                Err(e) => log::warn!("Clipboard hand-off failed: {}", e),
            }
        });

        opened_rx
            .recv()
            .map_err(|_| SinkError::clipboard("clipboard holder exited early"))??;
        self.holders.push(holder);
        Ok(())
    }

    #[cfg(not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )))]
    fn hand_off(&mut self, image: &RgbaImage) -> Result<(), SinkError> {
        self.copy_in_place(image)
    }
}

impl ImageSink for ClipboardSink {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn deliver(&mut self, image: &RgbaImage) -> Result<Delivery, SinkError> {
        match self.mode {
            ClipboardMode::KeepAlive => self.copy_in_place(image)?,
            ClipboardMode::HandOff => self.hand_off(image)?,
        }
        Ok(Delivery {
            sink: self.name(),
            message: "Screenshot copied to clipboard".to_string(),
        })
    }

    fn pending(&self) -> bool {
        self.holders.iter().any(|h| !h.is_finished())
    }

    fn finish(&mut self) {
        for holder in self.holders.drain(..) {
            if holder.join().is_err() {
                log::warn!("Clipboard holder thread panicked");
            }
        }
    }
}

/// Opaque share credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredential(String);

impl ClientCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential, for the share handler only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientCredential(***)")
    }
}

/// Everything an external uploader needs for one image.
#[derive(Clone, Debug, Serialize)]
pub struct SharePayload {
    pub client_id: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// Base64 JPEG bytes.
    pub image: String,
}

/// External collaborator that publishes a [`SharePayload`].
///
/// Returns a user-facing message (e.g. the link it produced).
pub trait ShareHandler {
    fn share(&mut self, payload: SharePayload) -> Result<String, SinkError>;
}

impl<F> ShareHandler for F
where
    F: FnMut(SharePayload) -> Result<String, SinkError>,
{
    fn share(&mut self, payload: SharePayload) -> Result<String, SinkError> {
        self(payload)
    }
}

/// Prepares images for sharing and passes them to a [`ShareHandler`].
pub struct ShareSink {
    credential: ClientCredential,
    handler: Box<dyn ShareHandler>,
}

impl ShareSink {
    pub fn new(credential: ClientCredential, handler: Box<dyn ShareHandler>) -> Self {
        Self {
            credential,
            handler,
        }
    }
}

impl ImageSink for ShareSink {
    fn name(&self) -> &'static str {
        "share"
    }

    fn deliver(&mut self, image: &RgbaImage) -> Result<Delivery, SinkError> {
        let payload = SharePayload {
            client_id: self.credential.expose().to_string(),
            mime_type: "image/jpeg",
            width: image.width(),
            height: image.height(),
            image: ImageProcessor::encode_to_base64_jpeg(image)?,
        };
        let message = self.handler.share(payload)?;
        Ok(Delivery {
            sink: self.name(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn file_name_follows_pattern() {
        assert_eq!(SaveSink::file_name_at(at()), "ShareShot_20240309_140507.png");
    }

    #[test]
    fn save_creates_folder_and_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SaveSink::new(dir.path().join("ShareShot"));
        let image = RgbaImage::from_pixel(50, 50, Rgba([1, 2, 3, 255]));

        let path = sink.save_at(&image, at()).unwrap();
        assert_eq!(path, dir.path().join("ShareShot/ShareShot_20240309_140507.png"));

        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), (50, 50));
        assert_eq!(reloaded.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn same_second_captures_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SaveSink::new(dir.path());
        let image = RgbaImage::new(12, 12);

        let first = sink.save_at(&image, at()).unwrap();
        let second = sink.save_at(&image, at()).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("ShareShot_20240309_140507_1.png"));
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let sink = SaveSink::new(blocker.join("sub"));
        let err = sink.save_at(&RgbaImage::new(12, 12), at()).unwrap_err();
        assert!(matches!(err, SinkError::Save { .. }));
    }

    #[test]
    fn share_sink_passes_credential_and_jpeg() {
        let handler = |payload: SharePayload| -> Result<String, SinkError> {
            assert_eq!(payload.mime_type, "image/jpeg");
            assert!(!payload.image.is_empty());
            Ok(format!("{}:{}x{}", payload.client_id, payload.width, payload.height))
        };
        let mut sink = ShareSink::new(ClientCredential::new("client-42"), Box::new(handler));

        let delivery = sink.deliver(&RgbaImage::new(20, 10)).unwrap();
        assert_eq!(delivery.sink, "share");
        assert_eq!(delivery.message, "client-42:20x10");
    }

    #[test]
    fn share_handler_errors_propagate() {
        let handler = |_: SharePayload| -> Result<String, SinkError> {
            Err(SinkError::share("rate limited"))
        };
        let mut sink = ShareSink::new(ClientCredential::new("id"), Box::new(handler));
        assert!(matches!(
            sink.deliver(&RgbaImage::new(12, 12)),
            Err(SinkError::Share(_))
        ));
    }

    #[test]
    fn clipboard_sink_defaults_to_keep_alive() {
        assert_eq!(ClipboardSink::default().mode(), ClipboardMode::KeepAlive);
        let sink = ClipboardSink::new(ClipboardMode::HandOff);
        assert_eq!(sink.mode(), ClipboardMode::HandOff);
        assert!(!sink.pending(), "nothing delivered, nothing to wait for");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = ClientCredential::new("secret");
        assert_eq!(format!("{credential:?}"), "ClientCredential(***)");
    }
}
