use std::collections::{HashMap, HashSet};

use crate::hotkey::{Hotkey, Key};
use crate::hotkey_registry::{BindingId, HotkeyError, KeyPhase, KeyTap, RawKeyEvent};
use crate::mailbox::Mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Ctrl,
    Shift,
    Alt,
    Cmd,
    Key(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapInput {
    Press(InputKey),
    Release(InputKey),
}

/// Tracks modifier and key state from a raw event stream and turns it into
/// edge-triggered press/release events per binding. Auto-repeated presses of
/// an already active combo produce nothing.
#[derive(Debug, Default)]
pub struct ComboMatcher {
    bindings: HashMap<BindingId, Hotkey>,
    ctrl: bool,
    shift: bool,
    alt: bool,
    cmd: bool,
    held: HashSet<Key>,
    active: HashSet<BindingId>,
}

impl ComboMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, id: BindingId, hotkey: Hotkey) {
        self.bindings.insert(id, hotkey);
    }

    pub fn unbind(&mut self, id: BindingId) {
        self.bindings.remove(&id);
        self.active.remove(&id);
    }

    /// True while some active combo uses `key` as its main key.
    pub fn is_claimed(&self, key: Key) -> bool {
        self.active
            .iter()
            .filter_map(|id| self.bindings.get(id))
            .any(|hk| hk.key == key)
    }

    pub fn process(&mut self, input: TapInput) -> Vec<RawKeyEvent> {
        match input {
            TapInput::Press(k) => self.set(k, true),
            TapInput::Release(k) => self.set(k, false),
        }

        let mut fired = Vec::new();
        let mut ids: Vec<BindingId> = self.bindings.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(hk) = self.bindings.get(&id).copied() else {
                continue;
            };
            let combo = self.held.contains(&hk.key)
                && self.ctrl == hk.ctrl
                && self.shift == hk.shift
                && self.alt == hk.alt
                && self.cmd == hk.cmd;
            let was_active = self.active.contains(&id);
            if combo && !was_active {
                tracing::debug!(binding = id, "combo '{}' pressed", hk);
                self.active.insert(id);
                fired.push(RawKeyEvent {
                    binding: id,
                    phase: KeyPhase::Pressed,
                });
            } else if !combo && was_active {
                tracing::debug!(binding = id, "combo '{}' released", hk);
                self.active.remove(&id);
                fired.push(RawKeyEvent {
                    binding: id,
                    phase: KeyPhase::Released,
                });
            }
        }
        fired
    }

    fn set(&mut self, key: InputKey, down: bool) {
        match key {
            InputKey::Ctrl => self.ctrl = down,
            InputKey::Shift => self.shift = down,
            InputKey::Alt => self.alt = down,
            InputKey::Cmd => self.cmd = down,
            InputKey::Key(k) => {
                if down {
                    self.held.insert(k);
                } else {
                    self.held.remove(&k);
                }
            }
        }
    }
}

/// Listener for platforms without a global key hook. Installation always
/// fails, which leaves the overlay running without hotkeys.
#[derive(Debug, Default)]
pub struct NullTap;

impl KeyTap for NullTap {
    fn install(&mut self, _sink: Mailbox) -> Result<(), HotkeyError> {
        Err(HotkeyError::ListenerUnavailable(
            "global key capture is not supported on this platform".into(),
        ))
    }

    fn bind(&mut self, _id: BindingId, hotkey: Hotkey) -> Result<(), HotkeyError> {
        Err(HotkeyError::Denied(hotkey.to_string()))
    }

    fn unbind(&mut self, _id: BindingId) {}
}

#[cfg(target_os = "macos")]
pub use self::rdev_tap::RdevTap;

/// The listener for the current platform.
pub fn platform_tap() -> Box<dyn KeyTap> {
    #[cfg(target_os = "macos")]
    {
        Box::new(RdevTap::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(NullTap)
    }
}

#[cfg(target_os = "macos")]
mod rdev_tap {
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use rdev::EventType;

    use super::{ComboMatcher, InputKey, TapInput};
    use crate::hotkey::{Hotkey, Key};
    use crate::hotkey_registry::{BindingId, HotkeyError, KeyTap};
    use crate::mailbox::{ControlMessage, Mailbox};

    /// How long install waits for the event tap to report a failure before
    /// assuming it is running.
    const INSTALL_GRACE: Duration = Duration::from_millis(250);

    pub struct RdevTap {
        matcher: Arc<Mutex<ComboMatcher>>,
        installed: bool,
    }

    impl RdevTap {
        pub fn new() -> Self {
            Self {
                matcher: Arc::new(Mutex::new(ComboMatcher::new())),
                installed: false,
            }
        }
    }

    impl Default for RdevTap {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KeyTap for RdevTap {
        fn install(&mut self, sink: Mailbox) -> Result<(), HotkeyError> {
            if self.installed {
                return Ok(());
            }
            let matcher = self.matcher.clone();
            let (status_tx, status_rx) = mpsc::channel::<String>();

            thread::Builder::new()
                .name("key-tap".into())
                .spawn(move || {
                    tracing::debug!("starting global key listener");
                    if let Err(e) = run_listener(matcher, sink) {
                        tracing::error!("global key listener failed: {e}");
                        let _ = status_tx.send(e);
                    }
                })
                .map_err(|e| HotkeyError::ListenerUnavailable(e.to_string()))?;

            match status_rx.recv_timeout(INSTALL_GRACE) {
                Ok(err) => Err(HotkeyError::ListenerUnavailable(err)),
                Err(RecvTimeoutError::Timeout) => {
                    self.installed = true;
                    Ok(())
                }
                Err(RecvTimeoutError::Disconnected) => Err(HotkeyError::ListenerUnavailable(
                    "listener exited during startup".into(),
                )),
            }
        }

        fn bind(&mut self, id: BindingId, hotkey: Hotkey) -> Result<(), HotkeyError> {
            let mut guard = self
                .matcher
                .lock()
                .map_err(|_| HotkeyError::Denied(hotkey.to_string()))?;
            guard.bind(id, hotkey);
            Ok(())
        }

        fn unbind(&mut self, id: BindingId) {
            if let Ok(mut guard) = self.matcher.lock() {
                guard.unbind(id);
            }
        }
    }

    #[cfg(not(feature = "unstable_grab"))]
    fn run_listener(matcher: Arc<Mutex<ComboMatcher>>, sink: Mailbox) -> Result<(), String> {
        rdev::listen(move |event| {
            let Some(input) = translate(&event.event_type) else {
                return;
            };
            let fired = match matcher.lock() {
                Ok(mut m) => m.process(input),
                Err(_) => return,
            };
            for ev in fired {
                sink.send(ControlMessage::Key(ev));
            }
        })
        .map_err(|e| format!("{e:?}"))
    }

    /// Grabbing variant: combos that belong to the overlay are swallowed
    /// instead of reaching the focused application.
    #[cfg(feature = "unstable_grab")]
    fn run_listener(matcher: Arc<Mutex<ComboMatcher>>, sink: Mailbox) -> Result<(), String> {
        rdev::grab(move |event| {
            let Some(input) = translate(&event.event_type) else {
                return Some(event);
            };
            let (fired, swallow) = match matcher.lock() {
                Ok(mut m) => {
                    let key = match input {
                        TapInput::Press(InputKey::Key(k)) | TapInput::Release(InputKey::Key(k)) => {
                            Some(k)
                        }
                        _ => None,
                    };
                    let before = key.map(|k| m.is_claimed(k)).unwrap_or(false);
                    let fired = m.process(input);
                    let after = key.map(|k| m.is_claimed(k)).unwrap_or(false);
                    (fired, before || after)
                }
                Err(_) => return Some(event),
            };
            for ev in fired {
                sink.send(ControlMessage::Key(ev));
            }
            if swallow {
                None
            } else {
                Some(event)
            }
        })
        .map_err(|e| format!("{e:?}"))
    }

    fn translate(event: &EventType) -> Option<TapInput> {
        match event {
            EventType::KeyPress(k) => map_key(*k).map(TapInput::Press),
            EventType::KeyRelease(k) => map_key(*k).map(TapInput::Release),
            _ => None,
        }
    }

    fn map_key(key: rdev::Key) -> Option<InputKey> {
        use rdev::Key as R;
        let k = match key {
            R::ControlLeft | R::ControlRight => return Some(InputKey::Ctrl),
            R::ShiftLeft | R::ShiftRight => return Some(InputKey::Shift),
            R::Alt | R::AltGr => return Some(InputKey::Alt),
            R::MetaLeft | R::MetaRight => return Some(InputKey::Cmd),
            R::Space => Key::Space,
            R::Tab => Key::Tab,
            R::Return => Key::Return,
            R::Escape => Key::Escape,
            R::Backspace => Key::Backspace,
            R::Delete => Key::Delete,
            R::Home => Key::Home,
            R::End => Key::End,
            R::PageUp => Key::PageUp,
            R::PageDown => Key::PageDown,
            R::UpArrow => Key::UpArrow,
            R::DownArrow => Key::DownArrow,
            R::LeftArrow => Key::LeftArrow,
            R::RightArrow => Key::RightArrow,
            R::F1 => Key::F(1),
            R::F2 => Key::F(2),
            R::F3 => Key::F(3),
            R::F4 => Key::F(4),
            R::F5 => Key::F(5),
            R::F6 => Key::F(6),
            R::F7 => Key::F(7),
            R::F8 => Key::F(8),
            R::F9 => Key::F(9),
            R::F10 => Key::F(10),
            R::F11 => Key::F(11),
            R::F12 => Key::F(12),
            R::Num0 => Key::Digit(0),
            R::Num1 => Key::Digit(1),
            R::Num2 => Key::Digit(2),
            R::Num3 => Key::Digit(3),
            R::Num4 => Key::Digit(4),
            R::Num5 => Key::Digit(5),
            R::Num6 => Key::Digit(6),
            R::Num7 => Key::Digit(7),
            R::Num8 => Key::Digit(8),
            R::Num9 => Key::Digit(9),
            R::KeyA => Key::Char('A'),
            R::KeyB => Key::Char('B'),
            R::KeyC => Key::Char('C'),
            R::KeyD => Key::Char('D'),
            R::KeyE => Key::Char('E'),
            R::KeyF => Key::Char('F'),
            R::KeyG => Key::Char('G'),
            R::KeyH => Key::Char('H'),
            R::KeyI => Key::Char('I'),
            R::KeyJ => Key::Char('J'),
            R::KeyK => Key::Char('K'),
            R::KeyL => Key::Char('L'),
            R::KeyM => Key::Char('M'),
            R::KeyN => Key::Char('N'),
            R::KeyO => Key::Char('O'),
            R::KeyP => Key::Char('P'),
            R::KeyQ => Key::Char('Q'),
            R::KeyR => Key::Char('R'),
            R::KeyS => Key::Char('S'),
            R::KeyT => Key::Char('T'),
            R::KeyU => Key::Char('U'),
            R::KeyV => Key::Char('V'),
            R::KeyW => Key::Char('W'),
            R::KeyX => Key::Char('X'),
            R::KeyY => Key::Char('Y'),
            R::KeyZ => Key::Char('Z'),
            _ => return None,
        };
        Some(InputKey::Key(k))
    }
}
