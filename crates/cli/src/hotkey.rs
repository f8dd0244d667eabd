//! Global hotkey detection on top of `rdev`.

use anyhow::{Result, bail};
use rdev::{EventType, Key};
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

/// A modifier chord plus one trigger key, e.g. `Ctrl+F9`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "super" | "win" | "cmd" => modifiers.meta = true,
                "" => bail!("empty key in hotkey '{s}'"),
                name => {
                    if key.is_some() {
                        bail!("hotkey '{s}' has more than one non-modifier key");
                    }
                    key = Some(parse_key(name).ok_or_else(|| {
                        anyhow::anyhow!("unknown key '{part}' in hotkey '{s}'")
                    })?);
                }
            }
        }

        match key {
            Some(key) => Ok(Self { modifiers, key }),
            None => bail!("hotkey '{s}' has no trigger key"),
        }
    }
}

fn parse_key(name: &str) -> Option<Key> {
    const FUNCTION_KEYS: [Key; 12] = [
        Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7, Key::F8, Key::F9, Key::F10,
        Key::F11, Key::F12,
    ];
    const LETTERS: [Key; 26] = [
        Key::KeyA, Key::KeyB, Key::KeyC, Key::KeyD, Key::KeyE, Key::KeyF, Key::KeyG, Key::KeyH,
        Key::KeyI, Key::KeyJ, Key::KeyK, Key::KeyL, Key::KeyM, Key::KeyN, Key::KeyO, Key::KeyP,
        Key::KeyQ, Key::KeyR, Key::KeyS, Key::KeyT, Key::KeyU, Key::KeyV, Key::KeyW, Key::KeyX,
        Key::KeyY, Key::KeyZ,
    ];
    const DIGITS: [Key; 10] = [
        Key::Num0, Key::Num1, Key::Num2, Key::Num3, Key::Num4, Key::Num5, Key::Num6, Key::Num7,
        Key::Num8, Key::Num9,
    ];

    match name {
        "printscreen" | "print" | "prtsc" => return Some(Key::PrintScreen),
        "space" => return Some(Key::Space),
        _ => {}
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        return FUNCTION_KEYS.get(n.checked_sub(1)?).copied();
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='z'), None) => Some(LETTERS[(c as u8 - b'a') as usize]),
        (Some(c @ '0'..='9'), None) => Some(DIGITS[(c as u8 - b'0') as usize]),
        _ => None,
    }
}

/// Tracks modifier state and reports each press of the chord once.
///
/// Holding the chord down (auto-repeat) fires only once; the chord re-arms
/// when any of its keys is released.
#[derive(Debug)]
pub struct HotkeyDetector {
    hotkey: Hotkey,
    held: Modifiers,
    fired: bool,
}

impl HotkeyDetector {
    pub fn new(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            held: Modifiers::default(),
            fired: false,
        }
    }

    /// Returns `true` when this press completes the chord.
    pub fn key_down(&mut self, key: Key) -> bool {
        if let Some(slot) = modifier_slot(&mut self.held, key) {
            *slot = true;
            return false;
        }
        if key == self.hotkey.key && self.held == self.hotkey.modifiers && !self.fired {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn key_up(&mut self, key: Key) {
        let part_of_chord = match modifier_slot(&mut self.held, key) {
            Some(slot) => {
                *slot = false;
                let mut chord = self.hotkey.modifiers;
                modifier_slot(&mut chord, key).is_some_and(|required| *required)
            }
            None => key == self.hotkey.key,
        };
        if part_of_chord {
            self.fired = false;
        }
    }
}

fn modifier_slot(modifiers: &mut Modifiers, key: Key) -> Option<&mut bool> {
    match key {
        Key::ControlLeft | Key::ControlRight => Some(&mut modifiers.ctrl),
        Key::Alt | Key::AltGr => Some(&mut modifiers.alt),
        Key::ShiftLeft | Key::ShiftRight => Some(&mut modifiers.shift),
        Key::MetaLeft | Key::MetaRight => Some(&mut modifiers.meta),
        _ => None,
    }
}

/// Listens for `hotkey` system-wide on a background thread.
///
/// Each completed chord sends the time of the press on `tx`.
pub fn spawn_listener(hotkey: Hotkey, tx: Sender<Instant>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut detector = HotkeyDetector::new(hotkey);
        let result = rdev::listen(move |event| match event.event_type {
            EventType::KeyPress(key) => {
                if detector.key_down(key) {
                    log::debug!("Hotkey pressed");
                    if tx.send(Instant::now()).is_err() {
                        log::debug!("Hotkey receiver gone");
                    }
                }
            }
            EventType::KeyRelease(key) => detector.key_up(key),
            _ => {}
        });
        if let Err(e) = result {
            log::error!("Global hotkey listener stopped: {:?}", e);
        }
    })
}
