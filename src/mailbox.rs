use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::capture::CaptureEvent;
use crate::hotkey_registry::RawKeyEvent;

/// Everything the control thread reacts to. Listener, timer and worker
/// threads never touch overlay state directly; they post one of these.
#[derive(Debug)]
pub enum ControlMessage {
    Key(RawKeyEvent),
    HoverChanged(bool),
    MotionTick { generation: u64 },
    Capture(CaptureEvent),
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Cloneable sending half of the control channel. Every send also wakes the
/// UI loop so the message is handled without waiting for the next input event.
#[derive(Clone)]
pub struct Mailbox {
    tx: Sender<ControlMessage>,
    waker: Waker,
}

impl Mailbox {
    /// Returns `false` once the control thread has gone away.
    pub fn send(&self, msg: ControlMessage) -> bool {
        if self.tx.send(msg).is_err() {
            tracing::debug!("control thread gone; dropping message");
            return false;
        }
        (self.waker)();
        true
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox").finish_non_exhaustive()
    }
}

/// Create a control channel whose sends call `waker`.
pub fn channel(waker: impl Fn() + Send + Sync + 'static) -> (Mailbox, Receiver<ControlMessage>) {
    let (tx, rx) = mpsc::channel();
    (
        Mailbox {
            tx,
            waker: Arc::new(waker),
        },
        rx,
    )
}

/// Control channel without a UI loop to wake, for headless use and tests.
pub fn unwoken_channel() -> (Mailbox, Receiver<ControlMessage>) {
    channel(|| {})
}
