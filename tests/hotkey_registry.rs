use glassbar::command::{CommandEvent, Direction};
use glassbar::hotkey::{parse_hotkey, HotkeyBinding};
use glassbar::hotkey_registry::{HotkeyError, HotkeyRegistry, KeyPhase, RawKeyEvent};
use glassbar::mailbox::unwoken_channel;

#[path = "fakes.rs"]
mod fakes;
use fakes::MockTap;

fn binding(s: &str) -> HotkeyBinding {
    HotkeyBinding::one_shot(parse_hotkey(s).unwrap())
}

fn press(id: u32) -> RawKeyEvent {
    RawKeyEvent {
        binding: id,
        phase: KeyPhase::Pressed,
    }
}

fn release(id: u32) -> RawKeyEvent {
    RawKeyEvent {
        binding: id,
        phase: KeyPhase::Released,
    }
}

#[test]
fn listener_installed_once_for_many_bindings() {
    let tap = MockTap::default();
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap.clone()), mailbox);

    reg.register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();
    reg.register_command(binding("Cmd+B"), CommandEvent::ToggleAlwaysOnTop, None)
        .unwrap();

    assert!(reg.is_installed());
    assert_eq!(reg.len(), 2);
    let log = tap.log.lock().unwrap();
    assert_eq!(log.installs, 1);
    assert_eq!(log.bound.len(), 2);
}

#[test]
fn dispatch_routes_press_and_release() {
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(MockTap::default()), mailbox);
    let up = reg
        .register_command(
            HotkeyBinding::repeating(parse_hotkey("Cmd+Up").unwrap()),
            CommandEvent::MoveStart(Direction::Up),
            Some(CommandEvent::MoveStop(Direction::Up)),
        )
        .unwrap();
    let quit = reg
        .register_command(binding("Ctrl+Cmd+Q"), CommandEvent::Quit, None)
        .unwrap();

    assert_eq!(
        reg.dispatch(press(up.id())),
        Some(CommandEvent::MoveStart(Direction::Up))
    );
    assert_eq!(
        reg.dispatch(release(up.id())),
        Some(CommandEvent::MoveStop(Direction::Up))
    );
    assert_eq!(reg.dispatch(press(quit.id())), Some(CommandEvent::Quit));
    assert_eq!(reg.dispatch(release(quit.id())), None);
    assert_eq!(reg.dispatch(press(99)), None);
}

#[test]
fn ids_are_never_reused() {
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(MockTap::default()), mailbox);
    let a = reg
        .register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();
    reg.unregister(a);
    let b = reg
        .register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();
    assert!(b.id() > a.id());
    // the old handle no longer routes anywhere
    assert_eq!(reg.dispatch(press(a.id())), None);
    assert_eq!(reg.dispatch(press(b.id())), Some(CommandEvent::ToggleAnalysis));
}

#[test]
fn unregister_is_idempotent() {
    let tap = MockTap::default();
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap.clone()), mailbox);
    let h = reg
        .register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();

    reg.unregister(h);
    reg.unregister(h);

    assert!(reg.is_empty());
    assert_eq!(tap.log.lock().unwrap().unbound, vec![h.id()]);
}

#[test]
fn duplicate_combo_is_rejected() {
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(MockTap::default()), mailbox);
    reg.register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();
    let err = reg
        .register_command(binding("cmd+h"), CommandEvent::Quit, None)
        .unwrap_err();
    assert_eq!(err, HotkeyError::AlreadyBound("Cmd+H".into()));
    assert_eq!(reg.len(), 1);
}

#[test]
fn install_failure_is_an_error_not_a_panic() {
    let tap = MockTap {
        fail_install: true,
        ..Default::default()
    };
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap), mailbox);
    let err = reg
        .register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap_err();
    assert!(matches!(err, HotkeyError::ListenerUnavailable(_)));
    assert!(!reg.is_installed());
    assert!(reg.is_empty());
}

#[test]
fn failed_install_is_not_retried() {
    let tap = MockTap {
        fail_install: true,
        ..Default::default()
    };
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap.clone()), mailbox);
    for combo in ["Cmd+H", "Cmd+B", "Ctrl+Cmd+Q"] {
        let err = reg
            .register_command(binding(combo), CommandEvent::ToggleAnalysis, None)
            .unwrap_err();
        assert_eq!(err, HotkeyError::ListenerUnavailable("no permission".into()));
    }
    let log = tap.log.lock().unwrap();
    assert_eq!(log.installs, 1);
    assert!(log.bound.is_empty());
    assert!(reg.is_empty());
}

#[test]
fn repeating_binding_needs_release_command() {
    let tap = MockTap::default();
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap.clone()), mailbox);
    let err = reg
        .register_command(
            HotkeyBinding::repeating(parse_hotkey("Cmd+Up").unwrap()),
            CommandEvent::MoveStart(Direction::Up),
            None,
        )
        .unwrap_err();
    assert_eq!(err, HotkeyError::MissingRelease("Cmd+Up".into()));
    assert!(reg.is_empty());
    assert!(tap.log.lock().unwrap().bound.is_empty());
}

#[test]
fn one_shot_binding_ignores_release() {
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(MockTap::default()), mailbox);
    let h = reg
        .register_command(
            binding("Cmd+Left"),
            CommandEvent::MoveStart(Direction::Left),
            Some(CommandEvent::MoveStop(Direction::Left)),
        )
        .unwrap();
    assert_eq!(
        reg.dispatch(press(h.id())),
        Some(CommandEvent::MoveStart(Direction::Left))
    );
    assert_eq!(reg.dispatch(release(h.id())), None);
}

#[test]
fn denied_binding_leaves_others_working() {
    let tap = MockTap {
        deny: parse_hotkey("Cmd+B"),
        ..Default::default()
    };
    let (mailbox, _rx) = unwoken_channel();
    let mut reg = HotkeyRegistry::new(Box::new(tap), mailbox);
    assert!(matches!(
        reg.register_command(binding("Cmd+B"), CommandEvent::ToggleAlwaysOnTop, None),
        Err(HotkeyError::Denied(_))
    ));
    let h = reg
        .register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
        .unwrap();
    assert_eq!(reg.dispatch(press(h.id())), Some(CommandEvent::ToggleAnalysis));
}

#[test]
fn drop_releases_all_bindings() {
    let tap = MockTap::default();
    let (mailbox, _rx) = unwoken_channel();
    {
        let mut reg = HotkeyRegistry::new(Box::new(tap.clone()), mailbox);
        reg.register_command(binding("Cmd+H"), CommandEvent::ToggleAnalysis, None)
            .unwrap();
        reg.register_command(binding("Cmd+B"), CommandEvent::ToggleAlwaysOnTop, None)
            .unwrap();
    }
    let mut unbound = tap.log.lock().unwrap().unbound.clone();
    unbound.sort_unstable();
    assert_eq!(unbound, vec![1, 2]);
}
