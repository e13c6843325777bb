use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::command::{CommandEvent, Direction};
use crate::hotkey::{parse_hotkey, Hotkey, HotkeyBinding, Key};

pub const APP_DIR_NAME: &str = "Glassbar";
pub const SETTINGS_FILE: &str = "settings.json";
pub const LOG_FILE: &str = "glassbar.log";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HotkeySettings {
    #[serde(default = "default_analysis_hotkey")]
    pub analysis: String,
    #[serde(default = "default_always_on_top_hotkey")]
    pub always_on_top: String,
    #[serde(default = "default_submit_hotkey")]
    pub submit: String,
    #[serde(default = "default_quit_hotkey")]
    pub quit: String,
    #[serde(default = "default_move_up_hotkey")]
    pub move_up: String,
    #[serde(default = "default_move_down_hotkey")]
    pub move_down: String,
    #[serde(default = "default_move_left_hotkey")]
    pub move_left: String,
    #[serde(default = "default_move_right_hotkey")]
    pub move_right: String,
}

fn default_analysis_hotkey() -> String {
    "Cmd+H".into()
}

fn default_always_on_top_hotkey() -> String {
    "Cmd+B".into()
}

fn default_submit_hotkey() -> String {
    "Cmd+Return".into()
}

fn default_quit_hotkey() -> String {
    "Ctrl+Cmd+Q".into()
}

fn default_move_up_hotkey() -> String {
    "Cmd+Up".into()
}

fn default_move_down_hotkey() -> String {
    "Cmd+Down".into()
}

fn default_move_left_hotkey() -> String {
    "Cmd+Left".into()
}

fn default_move_right_hotkey() -> String {
    "Cmd+Right".into()
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            analysis: default_analysis_hotkey(),
            always_on_top: default_always_on_top_hotkey(),
            submit: default_submit_hotkey(),
            quit: default_quit_hotkey(),
            move_up: default_move_up_hotkey(),
            move_down: default_move_down_hotkey(),
            move_left: default_move_left_hotkey(),
            move_right: default_move_right_hotkey(),
        }
    }
}

/// A binding together with the commands its press and release produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBinding {
    pub binding: HotkeyBinding,
    pub on_press: CommandEvent,
    pub on_release: Option<CommandEvent>,
}

fn parse_or(name: &str, value: &str, fallback: Hotkey) -> Hotkey {
    match parse_hotkey(value) {
        Some(k) => k,
        None => {
            tracing::warn!(
                "provided {name} hotkey string '{value}' is invalid; using default {fallback}"
            );
            fallback
        }
    }
}

impl HotkeySettings {
    /// Every command binding, invalid strings replaced by their defaults.
    pub fn bindings(&self) -> Vec<CommandBinding> {
        let one_shot = |name: &str, value: &str, fallback: Hotkey, cmd: CommandEvent| CommandBinding {
            binding: HotkeyBinding::one_shot(parse_or(name, value, fallback)),
            on_press: cmd,
            on_release: None,
        };
        let mut out = vec![
            one_shot(
                "analysis",
                &self.analysis,
                Hotkey::with_cmd(Key::Char('H')),
                CommandEvent::ToggleAnalysis,
            ),
            one_shot(
                "always_on_top",
                &self.always_on_top,
                Hotkey::with_cmd(Key::Char('B')),
                CommandEvent::ToggleAlwaysOnTop,
            ),
            one_shot(
                "submit",
                &self.submit,
                Hotkey::with_cmd(Key::Return),
                CommandEvent::SubmitQuery,
            ),
            one_shot(
                "quit",
                &self.quit,
                Hotkey {
                    ctrl: true,
                    ..Hotkey::with_cmd(Key::Char('Q'))
                },
                CommandEvent::Quit,
            ),
        ];

        for dir in Direction::ALL {
            let (name, value, key) = match dir {
                Direction::Up => ("move_up", &self.move_up, Key::UpArrow),
                Direction::Down => ("move_down", &self.move_down, Key::DownArrow),
                Direction::Left => ("move_left", &self.move_left, Key::LeftArrow),
                Direction::Right => ("move_right", &self.move_right, Key::RightArrow),
            };
            out.push(CommandBinding {
                binding: HotkeyBinding::repeating(parse_or(name, value, Hotkey::with_cmd(key))),
                on_press: CommandEvent::MoveStart(dir),
                on_release: Some(CommandEvent::MoveStop(dir)),
            });
        }
        out
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_model() -> String {
    "gpt-4-turbo".into()
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Last saved panel origin in screen space. Checked against the screen
    /// on startup.
    #[serde(default)]
    pub window_origin: Option<(f32, f32)>,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub hotkeys: HotkeySettings,
    #[serde(default)]
    pub model: ModelSettings,
    /// Wait between hiding the panel and capturing the display.
    #[serde(default = "default_capture_settle_ms")]
    pub capture_settle_ms: u64,
    #[serde(default = "default_move_step")]
    pub move_step: f32,
    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
    /// When set, every capture is also written into this directory.
    #[serde(default)]
    pub capture_dir: Option<String>,
    /// OCR language passed to tesseract (`-l`).
    #[serde(default)]
    pub ocr_language: Option<String>,
}

fn default_capture_settle_ms() -> u64 {
    crate::capture::DEFAULT_SETTLE_DELAY.as_millis() as u64
}

fn default_move_step() -> f32 {
    crate::motion::DEFAULT_MOVE_STEP
}

fn default_repeat_interval_ms() -> u64 {
    crate::motion::DEFAULT_REPEAT_INTERVAL.as_millis() as u64
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_origin: None,
            debug_logging: false,
            hotkeys: HotkeySettings::default(),
            model: ModelSettings::default(),
            capture_settle_ms: default_capture_settle_ms(),
            move_step: default_move_step(),
            repeat_interval_ms: default_repeat_interval_ms(),
            capture_dir: None,
            ocr_language: None,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn capture_settle(&self) -> Duration {
        Duration::from_millis(self.capture_settle_ms)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms.max(1))
    }
}

/// Where the panel origin is remembered between runs. Best-effort: a failed
/// load means "nothing saved", a failed save is only logged.
pub trait PositionStore {
    fn load_position(&self) -> Option<(f32, f32)>;
    fn save_position(&self, origin: (f32, f32));
}

/// File-backed settings in the application data directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        match Settings::load(&self.path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}; using defaults", self.path.display());
                Settings::default()
            }
        }
    }
}

impl PositionStore for SettingsStore {
    fn load_position(&self) -> Option<(f32, f32)> {
        Settings::load(&self.path).ok()?.window_origin
    }

    fn save_position(&self, origin: (f32, f32)) {
        let mut settings = self.load();
        settings.window_origin = Some(origin);
        if let Err(e) = settings.save(&self.path) {
            tracing::warn!("failed to save window position to {}: {e}", self.path.display());
        } else {
            tracing::debug!(?origin, "window position saved");
        }
    }
}

/// The per-user application directory, created if missing.
pub fn app_data_dir() -> anyhow::Result<PathBuf> {
    let base = dirs_next::data_dir().context("unable to determine the application data directory")?;
    let dir = base.join(APP_DIR_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}
