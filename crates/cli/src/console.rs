use shareshot_core::error::SinkError;
use shareshot_core::notify::{Notice, NoticeLevel, Notifier};
use shareshot_core::sink::SharePayload;
use std::io::{self, Write};

/// Prints notices to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice),
            NoticeLevel::Warning => eprintln!("Warning: {}", notice),
            NoticeLevel::Error => eprintln!("Error: {}", notice),
        }
    }
}

/// Share handler that writes each payload as one JSON line to stdout,
/// for an uploader script to pick up.
pub fn print_share_payload(payload: SharePayload) -> Result<String, SinkError> {
    let line = serde_json::to_string(&payload).map_err(|e| SinkError::share(e.to_string()))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)
        .and_then(|_| stdout.flush())
        .map_err(|e| SinkError::share(e.to_string()))?;

    Ok(format!(
        "Share request for {}x{} image written to stdout",
        payload.width, payload.height
    ))
}
