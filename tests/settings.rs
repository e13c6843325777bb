use glassbar::command::CommandEvent;
use glassbar::hotkey::{parse_hotkey, BindingKind};
use glassbar::settings::{PositionStore, Settings, SettingsStore};
use tempfile::tempdir;

#[test]
fn missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let s = Settings::load(dir.path().join("settings.json")).unwrap();
    assert_eq!(s, Settings::default());
    assert_eq!(s.capture_settle_ms, 100);
    assert_eq!(s.repeat_interval_ms, 50);
    assert_eq!(s.model.api_key_env, "OPENAI_API_KEY");
}

#[test]
fn partial_file_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"debug_logging": true, "hotkeys": {"analysis": "Ctrl+Shift+H"}}"#)
        .unwrap();
    let s = Settings::load(&path).unwrap();
    assert!(s.debug_logging);
    assert_eq!(s.hotkeys.analysis, "Ctrl+Shift+H");
    assert_eq!(s.hotkeys.quit, "Ctrl+Cmd+Q");
    assert_eq!(s.move_step, 10.0);
}

#[test]
fn position_round_trips_through_store() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    assert_eq!(store.load_position(), None);

    store.save_position((120.0, 640.0));
    assert_eq!(store.load_position(), Some((120.0, 640.0)));
    // other settings survive a position write
    assert_eq!(store.load().hotkeys.analysis, "Cmd+H");
}

#[test]
fn corrupt_file_means_no_saved_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = SettingsStore::new(path);
    assert_eq!(store.load_position(), None);
    assert_eq!(store.load(), Settings::default());
}

#[test]
fn save_failure_is_swallowed() {
    let dir = tempdir().unwrap();
    // a directory where the file should be makes the write fail
    let path = dir.path().join("settings.json");
    std::fs::create_dir(&path).unwrap();
    let store = SettingsStore::new(path);
    store.save_position((1.0, 2.0));
    assert_eq!(store.load_position(), None);
}

#[test]
fn default_bindings_cover_every_command() {
    let bindings = Settings::default().hotkeys.bindings();
    assert_eq!(bindings.len(), 8);
    assert_eq!(bindings[0].on_press, CommandEvent::ToggleAnalysis);
    assert_eq!(bindings[0].binding.hotkey, parse_hotkey("Cmd+H").unwrap());
    let repeating = bindings
        .iter()
        .filter(|b| b.binding.kind == BindingKind::Repeating)
        .count();
    assert_eq!(repeating, 4);
    assert!(bindings
        .iter()
        .filter(|b| b.binding.kind == BindingKind::Repeating)
        .all(|b| match (b.on_press, b.on_release) {
            (CommandEvent::MoveStart(dir), Some(CommandEvent::MoveStop(stop))) => dir == stop,
            _ => false,
        }));
}

#[test]
fn invalid_hotkey_string_falls_back() {
    let mut s = Settings::default();
    s.hotkeys.always_on_top = "Ctrl+Nope".into();
    let bindings = s.hotkeys.bindings();
    assert_eq!(bindings[1].binding.hotkey, parse_hotkey("Cmd+B").unwrap());
}
