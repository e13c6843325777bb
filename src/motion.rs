use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::command::Direction;
use crate::mailbox::{ControlMessage, Mailbox};

pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_MOVE_STEP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionEffect {
    MoveBy { dx: f32, dy: f32 },
    PersistPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving { direction: Direction, generation: u64 },
}

/// Background ticker posting [`ControlMessage::MotionTick`] every interval
/// until cancelled. The first tick arrives one interval after start.
pub struct RepeatTimer {
    stop: Arc<AtomicBool>,
}

impl RepeatTimer {
    pub fn start(interval: Duration, generation: u64, mailbox: Mailbox) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        thread::spawn(move || loop {
            thread::sleep(interval);
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if !mailbox.send(ControlMessage::MotionTick { generation }) {
                break;
            }
        });
        Self { stop }
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for RepeatTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Turns a held move key into periodic move effects. Ticks carry the
/// generation they were started with so a tick already queued when the key
/// is released is ignored.
pub struct RepeatMotionController {
    state: MotionState,
    generation: u64,
    interval: Duration,
    step: f32,
    timer: Option<RepeatTimer>,
    mailbox: Mailbox,
}

impl RepeatMotionController {
    pub fn new(mailbox: Mailbox, interval: Duration, step: f32) -> Self {
        Self {
            state: MotionState::Idle,
            generation: 0,
            interval,
            step,
            timer: None,
            mailbox,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, MotionState::Moving { .. })
    }

    /// Start repeating in `direction`. Returns `false` when a repeat is
    /// already running, including duplicate presses from OS key repeat.
    pub fn on_press(&mut self, direction: Direction) -> bool {
        if self.is_moving() {
            return false;
        }
        self.generation += 1;
        self.state = MotionState::Moving {
            direction,
            generation: self.generation,
        };
        self.timer = Some(RepeatTimer::start(
            self.interval,
            self.generation,
            self.mailbox.clone(),
        ));
        tracing::debug!(?direction, generation = self.generation, "move repeat started");
        true
    }

    pub fn on_tick(&mut self, generation: u64) -> Option<MotionEffect> {
        match self.state {
            MotionState::Moving {
                direction,
                generation: current,
            } if current == generation => {
                let (ux, uy) = direction.unit();
                Some(MotionEffect::MoveBy {
                    dx: ux * self.step,
                    dy: uy * self.step,
                })
            }
            _ => None,
        }
    }

    /// Stop repeating when `direction` is the one being repeated. Yields the
    /// single persist effect for this press; releases of other move keys are
    /// ignored.
    pub fn on_release(&mut self, direction: Direction) -> Option<MotionEffect> {
        match self.state {
            MotionState::Moving { direction: active, .. } if active == direction => self.stop(),
            MotionState::Moving { direction: active, .. } => {
                tracing::debug!(?direction, ?active, "release of inactive move key ignored");
                None
            }
            MotionState::Idle => None,
        }
    }

    /// Stop whatever repeat is running.
    pub fn stop(&mut self) -> Option<MotionEffect> {
        if !self.is_moving() {
            return None;
        }
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.state = MotionState::Idle;
        tracing::debug!(generation = self.generation, "move repeat stopped");
        Some(MotionEffect::PersistPosition)
    }
}
