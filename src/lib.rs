pub mod answer;
pub mod capture;
pub mod command;
pub mod coordinator;
pub mod gui;
pub mod hotkey;
pub mod hotkey_registry;
pub mod key_tap;
pub mod logging;
pub mod mailbox;
pub mod model;
pub mod motion;
pub mod native;
pub mod ocr;
pub mod overlay;
pub mod screen;
pub mod session;
pub mod settings;
