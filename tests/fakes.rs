#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use glassbar::coordinator::Coordinator;
use glassbar::hotkey::Hotkey;
use glassbar::hotkey_registry::{BindingId, HotkeyError, KeyTap};
use glassbar::mailbox::{ControlMessage, Mailbox};
use glassbar::model::{ModelClient, ModelError};
use glassbar::ocr::{OcrError, TextRecognizer};
use glassbar::screen::{CaptureError, DisplayCapture};
use glassbar::settings::PositionStore;

#[derive(Debug, Default)]
pub struct TapLog {
    /// Install attempts, successful or not.
    pub installs: usize,
    pub bound: Vec<(BindingId, Hotkey)>,
    pub unbound: Vec<BindingId>,
}

/// Key tap that records what the registry asks of it.
#[derive(Clone, Default)]
pub struct MockTap {
    pub log: Arc<Mutex<TapLog>>,
    pub fail_install: bool,
    pub deny: Option<Hotkey>,
}

impl KeyTap for MockTap {
    fn install(&mut self, _sink: Mailbox) -> Result<(), HotkeyError> {
        self.log.lock().unwrap().installs += 1;
        if self.fail_install {
            return Err(HotkeyError::ListenerUnavailable("no permission".into()));
        }
        Ok(())
    }

    fn bind(&mut self, id: BindingId, hotkey: Hotkey) -> Result<(), HotkeyError> {
        if self.deny == Some(hotkey) {
            return Err(HotkeyError::Denied(hotkey.to_string()));
        }
        self.log.lock().unwrap().bound.push((id, hotkey));
        Ok(())
    }

    fn unbind(&mut self, id: BindingId) {
        self.log.lock().unwrap().unbound.push(id);
    }
}

pub struct FakeDisplay {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeDisplay {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DisplayCapture for FakeDisplay {
    fn capture_display(&self) -> Result<Vec<u8>, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(CaptureError::NoDisplay)
        } else {
            Ok(b"\x89PNG fake".to_vec())
        }
    }
}

pub struct FakeOcr {
    pub text: String,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for FakeOcr {
    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Model that answers with a fixed string, or an API error when `answer` is
/// `None`. Every request is recorded.
pub struct FakeModel {
    pub answer: Option<String>,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl FakeModel {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ModelClient for FakeModel {
    fn ask(&self, context: &str, query: &str) -> Result<String, ModelError> {
        self.requests
            .lock()
            .unwrap()
            .push((context.to_string(), query.to_string()));
        match &self.answer {
            Some(a) => Ok(a.clone()),
            None => Err(ModelError::Api("quota exceeded".into())),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub saved: Arc<Mutex<Option<(f32, f32)>>>,
    pub writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn with_position(pos: (f32, f32)) -> Self {
        let store = Self::default();
        *store.saved.lock().unwrap() = Some(pos);
        store
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PositionStore for MemoryStore {
    fn load_position(&self) -> Option<(f32, f32)> {
        *self.saved.lock().unwrap()
    }

    fn save_position(&self, origin: (f32, f32)) {
        *self.saved.lock().unwrap() = Some(origin);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Feed messages to the coordinator until `done` holds. Panics after a
/// generous timeout so a broken chain fails instead of hanging.
pub fn pump_until(
    coordinator: &mut Coordinator,
    inbox: &Receiver<ControlMessage>,
    mut done: impl FnMut(&Coordinator) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(coordinator) {
        let left = deadline.saturating_duration_since(Instant::now());
        assert!(!left.is_zero(), "timed out waiting for the coordinator");
        if let Ok(msg) = inbox.recv_timeout(left) {
            coordinator.handle(msg);
        }
    }
}

/// Feed every message that arrives within `window`.
pub fn pump_for(coordinator: &mut Coordinator, inbox: &Receiver<ControlMessage>, window: Duration) {
    let deadline = Instant::now() + window;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        if let Ok(msg) = inbox.recv_timeout(left) {
            coordinator.handle(msg);
        }
    }
}
