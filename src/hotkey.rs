use std::fmt;

/// Keys the overlay can bind. Modifier keys are tracked separately by the
/// listener and never appear as the bound key of a [`Hotkey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Digit(u8),
    F(u8),
    Space,
    Tab,
    Return,
    Escape,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Digit(d) => write!(f, "{d}"),
            Key::F(n) => write!(f, "F{n}"),
            Key::Space => write!(f, "Space"),
            Key::Tab => write!(f, "Tab"),
            Key::Return => write!(f, "Return"),
            Key::Escape => write!(f, "Esc"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
            Key::PageUp => write!(f, "PageUp"),
            Key::PageDown => write!(f, "PageDown"),
            Key::UpArrow => write!(f, "Up"),
            Key::DownArrow => write!(f, "Down"),
            Key::LeftArrow => write!(f, "Left"),
            Key::RightArrow => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub cmd: bool,
}

impl Hotkey {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
            cmd: false,
        }
    }

    pub fn with_cmd(key: Key) -> Self {
        Self {
            cmd: true,
            ..Self::new(key)
        }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        if self.cmd {
            write!(f, "Cmd+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Whether a binding fires once per press or drives a repeat until release.
/// Only repeating bindings see their key release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    OneShot,
    Repeating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub hotkey: Hotkey,
    pub kind: BindingKind,
}

impl HotkeyBinding {
    pub fn one_shot(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            kind: BindingKind::OneShot,
        }
    }

    pub fn repeating(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            kind: BindingKind::Repeating,
        }
    }
}

/// Parse a hotkey string like "Cmd+Shift+Space" into a [`Hotkey`].
pub fn parse_hotkey(s: &str) -> Option<Hotkey> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut cmd = false;
    let mut key: Option<Key> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => ctrl = true,
            "SHIFT" => shift = true,
            "ALT" | "OPTION" | "OPT" => alt = true,
            "CMD" | "COMMAND" | "META" | "SUPER" | "WIN" => cmd = true,
            "" => {}
            _ => {
                // a second non-modifier key makes the combo ambiguous
                if key.is_some() {
                    return None;
                }
                key = Some(parse_key(&upper)?);
            }
        }
    }

    key.map(|k| Hotkey {
        key: k,
        ctrl,
        shift,
        alt,
        cmd,
    })
}

fn parse_key(upper: &str) -> Option<Key> {
    match upper {
        "SPACE" => Some(Key::Space),
        "TAB" => Some(Key::Tab),
        "ENTER" | "RETURN" => Some(Key::Return),
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "DELETE" => Some(Key::Delete),
        "BACKSPACE" => Some(Key::Backspace),
        "HOME" => Some(Key::Home),
        "END" => Some(Key::End),
        "PAGEUP" => Some(Key::PageUp),
        "PAGEDOWN" => Some(Key::PageDown),
        "LEFT" | "LEFTARROW" => Some(Key::LeftArrow),
        "RIGHT" | "RIGHTARROW" => Some(Key::RightArrow),
        "UP" | "UPARROW" => Some(Key::UpArrow),
        "DOWN" | "DOWNARROW" => Some(Key::DownArrow),
        _ if upper.len() > 1 && upper.starts_with('F') => match upper[1..].parse::<u8>().ok() {
            Some(n @ 1..=12) => Some(Key::F(n)),
            _ => None,
        },
        _ if upper.len() == 1 => {
            let c = upper.chars().next()?;
            if c.is_ascii_digit() {
                c.to_digit(10).map(|d| Key::Digit(d as u8))
            } else if c.is_ascii_alphabetic() {
                Some(Key::Char(c))
            } else {
                None
            }
        }
        _ => None,
    }
}
