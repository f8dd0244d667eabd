mod console;
mod hotkey;

use anyhow::{Context, Result};
use clap::Parser;
use console::{ConsoleNotifier, print_share_payload};
use env_logger::Env;
use hotkey::Hotkey;
use shareshot_core::{
    config::Config,
    coordinator::CycleOutcome,
    sink::{ClientCredential, ClipboardMode, ShareHandler},
    DesktopCoordinator, ShareShot,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stay in the background and capture whenever the hotkey is pressed
    #[arg(short, long)]
    daemon: bool,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,

    /// Folder to save screenshots into (default: Pictures/ShareShot)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Do not copy the screenshot to the clipboard
    #[arg(long)]
    no_clipboard: bool,

    /// Write a share request (JSON) for each screenshot to stdout
    #[arg(short, long)]
    share: bool,

    /// Client id passed along with share requests
    #[arg(long)]
    client_id: Option<String>,

    /// Override the capture hotkey used in daemon mode, e.g. "Ctrl+Shift+S"
    #[arg(long)]
    hotkey: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Setup
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = Config::load().context("Failed to load configuration")?;
    let app = ShareShot::with_config(apply_overrides(config, &args));

    // Handle --list-monitors
    if args.list_monitors {
        println!("Available monitors:");
        for info in app.list_monitors().context("Failed to enumerate monitors")? {
            println!("{}", info);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let share_handler: Option<Box<dyn ShareHandler>> = app
        .config()
        .share_enabled
        .then(|| Box::new(print_share_payload) as Box<dyn ShareHandler>);

    let clipboard = if args.daemon {
        ClipboardMode::KeepAlive
    } else {
        ClipboardMode::HandOff
    };
    let mut coordinator = app
        .coordinator(Box::new(ConsoleNotifier), share_handler, clipboard)
        .context("Failed to set up capture")?;

    if args.daemon {
        let hotkey: Hotkey = app
            .config()
            .hotkey
            .parse()
            .with_context(|| format!("Invalid hotkey '{}'", app.config().hotkey))?;
        run_daemon(&mut coordinator, hotkey, &app.config().hotkey);
        return Ok(ExitCode::SUCCESS);
    }

    let code = match coordinator.start_cycle() {
        CycleOutcome::Completed(report) if report.failures.is_empty() => ExitCode::SUCCESS,
        CycleOutcome::Completed(_) | CycleOutcome::Failed(_) | CycleOutcome::Busy => {
            ExitCode::FAILURE
        }
        CycleOutcome::Cancelled => {
            println!("Selection cancelled");
            ExitCode::SUCCESS
        }
    };

    if coordinator.has_pending_deliveries() {
        eprintln!("Keeping the screenshot on the clipboard until something else is copied.");
        coordinator.finish();
    }
    Ok(code)
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(dir) = &args.output_dir {
        config.save_dir = Some(dir.clone());
    }
    if args.no_clipboard {
        config.copy_to_clipboard = false;
    }
    if args.share {
        config.share_enabled = true;
    }
    if let Some(id) = args.client_id.as_deref().filter(|id| !id.trim().is_empty()) {
        config.client_id = Some(ClientCredential::new(id));
    }
    if let Some(hotkey) = &args.hotkey {
        config.hotkey = hotkey.clone();
    }
    config
}

/// Runs capture cycles on the main thread, one per hotkey press.
///
/// Presses made while a cycle held the capture guard are dropped, as a
/// second trigger during a capture is a no-op. A press made after the guard
/// was released (for example while a slow share handler runs) starts the
/// next cycle.
fn run_daemon(coordinator: &mut DesktopCoordinator, hotkey: Hotkey, label: &str) {
    let (tx, rx) = mpsc::channel();
    let _listener = hotkey::spawn_listener(hotkey, tx);
    eprintln!("ShareShot is running. Press {} to capture.", label);

    let mut next = None;
    loop {
        if next.take().is_none() && rx.recv().is_err() {
            break;
        }

        let released_at = match coordinator.start_cycle() {
            CycleOutcome::Completed(report) => report.released_at,
            _ => Instant::now(),
        };

        let (press, dropped) = first_press_after(&rx, released_at);
        if dropped > 0 {
            log::debug!("Dropped {} hotkey presses received during capture", dropped);
        }
        next = press;
    }

    log::warn!("Hotkey listener exited; shutting down");
}

/// Takes queued presses until one made at or after `released_at`.
///
/// Returns that press, if any, and how many earlier ones were discarded.
fn first_press_after(rx: &Receiver<Instant>, released_at: Instant) -> (Option<Instant>, usize) {
    let mut dropped = 0;
    for pressed_at in rx.try_iter() {
        if pressed_at >= released_at {
            return (Some(pressed_at), dropped);
        }
        dropped += 1;
    }
    (None, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_config() -> Config {
        Config::builder().build().unwrap()
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "shareshot",
            "--output-dir",
            "/tmp/shots",
            "--no-clipboard",
            "--share",
            "--client-id",
            "abc",
            "--hotkey",
            "Alt+F1",
        ]);
        let config = apply_overrides(base_config(), &args);

        assert_eq!(config.save_dir, Some(PathBuf::from("/tmp/shots")));
        assert!(!config.copy_to_clipboard);
        assert!(config.share_enabled);
        assert_eq!(config.client_id.as_ref().map(|c| c.expose()), Some("abc"));
        assert_eq!(config.hotkey, "Alt+F1");
    }

    #[test]
    fn presses_during_capture_are_dropped() {
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        tx.send(start).unwrap();
        tx.send(start + Duration::from_millis(5)).unwrap();

        let (next, dropped) = first_press_after(&rx, start + Duration::from_millis(10));
        assert_eq!(next, None);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn press_after_release_starts_next_cycle() {
        let (tx, rx) = mpsc::channel();
        let during = Instant::now();
        let released_at = during + Duration::from_millis(10);
        let after = during + Duration::from_millis(20);
        tx.send(during).unwrap();
        tx.send(after).unwrap();
        tx.send(after).unwrap();

        let (next, dropped) = first_press_after(&rx, released_at);
        assert_eq!(next, Some(after));
        assert_eq!(dropped, 1);
        // Later presses stay queued for the following cycle.
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn no_flags_keep_config() {
        let args = Args::parse_from(["shareshot"]);
        let config = apply_overrides(base_config(), &args);

        assert!(config.copy_to_clipboard);
        assert!(!config.share_enabled);
        assert_eq!(config.hotkey, "Ctrl+F9");
    }
}
