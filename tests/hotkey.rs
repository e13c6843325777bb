use glassbar::hotkey::{parse_hotkey, Key};

#[test]
fn parse_simple_f_key() {
    let hk = parse_hotkey("F2").expect("should parse F2");
    assert_eq!(hk.key, Key::F(2));
    assert!(!hk.ctrl && !hk.shift && !hk.alt && !hk.cmd);
}

#[test]
fn parse_combo_hotkey() {
    let hk = parse_hotkey("Ctrl+Shift+Space").expect("should parse combination");
    assert_eq!(hk.key, Key::Space);
    assert!(hk.ctrl && hk.shift && !hk.alt && !hk.cmd);
}

#[test]
fn parse_command_aliases() {
    for s in ["Cmd+H", "command+h", "Meta+H", "Super+h"] {
        let hk = parse_hotkey(s).unwrap_or_else(|| panic!("should parse {s}"));
        assert_eq!(hk.key, Key::Char('H'));
        assert!(hk.cmd, "{s} should set cmd");
    }
    let hk = parse_hotkey("Option+Return").unwrap();
    assert!(hk.alt);
    assert_eq!(hk.key, Key::Return);
}

#[test]
fn parse_arrows_and_digits() {
    assert_eq!(parse_hotkey("Cmd+Up").unwrap().key, Key::UpArrow);
    assert_eq!(parse_hotkey("Cmd+LeftArrow").unwrap().key, Key::LeftArrow);
    assert_eq!(parse_hotkey("Alt+7").unwrap().key, Key::Digit(7));
}

#[test]
fn parse_invalid_hotkey() {
    assert!(parse_hotkey("Ctrl+Foo").is_none());
    assert!(parse_hotkey("Ctrl+Shift").is_none());
    assert!(parse_hotkey("F13").is_none());
    assert!(parse_hotkey("").is_none());
}
