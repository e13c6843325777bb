use crate::capture::{CaptureSequencer, SequencerStep};
use crate::command::CommandEvent;
use crate::hotkey_registry::{HotkeyError, HotkeyRegistry, RegistrationHandle};
use crate::mailbox::ControlMessage;
use crate::motion::{MotionEffect, RepeatMotionController};
use crate::overlay::OverlayWindowController;
use crate::session::{SessionEffect, SessionStateMachine};
use crate::settings::{CommandBinding, PositionStore};

/// Lives on the control thread and is the only code that mutates session
/// state or window geometry. Everything else reaches it as a
/// [`ControlMessage`].
pub struct Coordinator {
    registry: HotkeyRegistry,
    motion: RepeatMotionController,
    window: OverlayWindowController,
    sequencer: CaptureSequencer,
    session: SessionStateMachine,
    positions: Box<dyn PositionStore>,
    quit_requested: bool,
    shut_down: bool,
}

impl Coordinator {
    pub fn new(
        registry: HotkeyRegistry,
        motion: RepeatMotionController,
        window: OverlayWindowController,
        sequencer: CaptureSequencer,
        positions: Box<dyn PositionStore>,
    ) -> Self {
        Self {
            registry,
            motion,
            window,
            sequencer,
            session: SessionStateMachine::new(),
            positions,
            quit_requested: false,
            shut_down: false,
        }
    }

    /// Register every binding. Failures are logged and returned; the
    /// affected commands are simply unavailable.
    pub fn register_bindings(
        &mut self,
        bindings: &[CommandBinding],
    ) -> (Vec<RegistrationHandle>, Vec<HotkeyError>) {
        let mut handles = Vec::new();
        let mut errors = Vec::new();
        for b in bindings {
            match self
                .registry
                .register_command(b.binding, b.on_press, b.on_release)
            {
                Ok(h) => handles.push(h),
                Err(e) => {
                    tracing::error!("failed to register '{}': {e}", b.binding.hotkey);
                    errors.push(e);
                }
            }
        }
        (handles, errors)
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.session
    }

    pub fn window(&self) -> &OverlayWindowController {
        &self.window
    }

    pub fn registry(&self) -> &HotkeyRegistry {
        &self.registry
    }

    pub fn motion(&self) -> &RepeatMotionController {
        &self.motion
    }

    pub fn sequencer(&self) -> &CaptureSequencer {
        &self.sequencer
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn handle(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Key(event) => {
                if let Some(cmd) = self.registry.dispatch(event) {
                    self.command(cmd);
                }
            }
            ControlMessage::HoverChanged(hovering) => self.window.hover_changed(hovering),
            ControlMessage::MotionTick { generation } => {
                if let Some(effect) = self.motion.on_tick(generation) {
                    self.apply_motion(effect);
                }
            }
            ControlMessage::Capture(event) => {
                let step = self.sequencer.on_event(event);
                self.apply_step(step);
            }
        }
    }

    pub fn command(&mut self, cmd: CommandEvent) {
        tracing::debug!(?cmd, "command");
        match cmd {
            CommandEvent::ToggleAnalysis => {
                let effects = self.session.toggle_analysis();
                self.apply_effects(effects);
            }
            CommandEvent::ToggleAlwaysOnTop => self.window.toggle_always_on_top(),
            CommandEvent::SubmitQuery => {
                let effects = self.session.submit_query();
                self.apply_effects(effects);
            }
            CommandEvent::Quit => {
                tracing::info!("quit requested");
                self.shutdown();
                self.quit_requested = true;
            }
            CommandEvent::MoveStart(direction) => {
                self.motion.on_press(direction);
            }
            CommandEvent::MoveStop(direction) => {
                if let Some(effect) = self.motion.on_release(direction) {
                    self.apply_motion(effect);
                }
            }
        }
    }

    fn apply_motion(&mut self, effect: MotionEffect) {
        match effect {
            MotionEffect::MoveBy { dx, dy } => self.window.move_by(dx, dy),
            MotionEffect::PersistPosition => {
                self.positions.save_position(self.window.current_origin());
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::Resize { expanded } => self.window.apply_state(expanded),
                SessionEffect::StartCapture => {
                    self.window.set_visible(false);
                    if self.sequencer.begin().is_none() {
                        self.session.capture_deferred();
                    }
                }
                SessionEffect::Recognize(png) => self.sequencer.recognize(png),
                SessionEffect::Ask { context, query } => self.sequencer.ask(context, query),
                SessionEffect::AskAgain { context, query } => {
                    self.sequencer.ask_again(context, query);
                }
                SessionEffect::FinishJob => self.sequencer.finish(),
            }
        }
    }

    fn apply_step(&mut self, step: SequencerStep) {
        match step {
            SequencerStep::Captured(result) => {
                self.window.set_visible(true);
                let effects = self.session.capture_finished(result);
                self.apply_effects(effects);
            }
            SequencerStep::Recognized(text) => {
                let effects = self.session.text_recognized(text);
                self.apply_effects(effects);
            }
            SequencerStep::Answered(result) => self.session.answer_received(result),
            SequencerStep::Resume => {
                if self.session.is_awaiting_display() && self.sequencer.begin().is_some() {
                    self.session.capture_resumed();
                } else {
                    self.window.set_visible(true);
                }
            }
            SequencerStep::Stale => {}
        }
    }

    /// Persist the position and release every binding. Runs once; later
    /// calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.motion.stop();
        self.positions.save_position(self.window.current_origin());
        self.registry.unregister_all();
        tracing::info!("shutdown complete");
    }
}
