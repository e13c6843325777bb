use std::fmt;

use crate::model::ModelError;
use crate::screen::CaptureError;

pub const NO_TEXT_MESSAGE: &str = "No text found on screen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Collapsed,
    /// Expanded and waiting for an earlier capture to release the display.
    Idle,
    Capturing,
    Loading,
    Result,
    Error,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Collapsed => "collapsed",
            SessionPhase::Idle => "idle",
            SessionPhase::Capturing => "capturing",
            SessionPhase::Loading => "loading",
            SessionPhase::Result => "result",
            SessionPhase::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub is_expanded: bool,
    pub is_loading: bool,
    pub captured_image: Option<Vec<u8>>,
    /// Bumped on every stored capture so views can tell images apart.
    pub capture_seq: u64,
    pub extracted_text: Option<String>,
    pub user_query: String,
    pub result_text: Option<String>,
    pub phase: SessionPhase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_expanded: false,
            is_loading: false,
            captured_image: None,
            capture_seq: 0,
            extracted_text: None,
            user_query: String::new(),
            result_text: None,
            phase: SessionPhase::Collapsed,
        }
    }
}

/// Work the coordinator performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    Resize { expanded: bool },
    StartCapture,
    Recognize(Vec<u8>),
    Ask { context: String, query: String },
    AskAgain { context: String, query: String },
    FinishJob,
}

/// Owns the single [`SessionState`]. Results of a cycle keep landing after
/// a collapse; they only leave the phase untouched.
#[derive(Debug, Default)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.user_query = query.into();
    }

    pub fn query_mut(&mut self) -> &mut String {
        &mut self.state.user_query
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.state.is_expanded && self.state.phase != phase {
            tracing::debug!(from = %self.state.phase, to = %phase, "session phase");
            self.state.phase = phase;
        }
    }

    pub fn toggle_analysis(&mut self) -> Vec<SessionEffect> {
        if self.state.is_expanded {
            self.state.is_expanded = false;
            self.state.phase = SessionPhase::Collapsed;
            tracing::info!("overlay collapsed");
            return vec![SessionEffect::Resize { expanded: false }];
        }

        self.state.is_expanded = true;
        self.state.is_loading = true;
        self.state.captured_image = None;
        self.state.extracted_text = None;
        self.state.result_text = None;
        self.state.phase = SessionPhase::Capturing;
        tracing::info!("overlay expanded; starting analysis");
        vec![
            SessionEffect::Resize { expanded: true },
            SessionEffect::StartCapture,
        ]
    }

    /// The display is still held by an earlier capture.
    pub fn capture_deferred(&mut self) {
        if self.state.phase == SessionPhase::Capturing {
            self.set_phase(SessionPhase::Idle);
        }
    }

    pub fn capture_resumed(&mut self) {
        if self.state.phase == SessionPhase::Idle {
            self.set_phase(SessionPhase::Capturing);
        }
    }

    /// Expanded and waiting for the display.
    pub fn is_awaiting_display(&self) -> bool {
        self.state.is_expanded && self.state.phase == SessionPhase::Idle
    }

    pub fn capture_finished(&mut self, result: Result<Vec<u8>, CaptureError>) -> Vec<SessionEffect> {
        match result {
            Ok(png) => {
                tracing::debug!(bytes = png.len(), "display captured");
                self.state.captured_image = Some(png.clone());
                self.state.capture_seq += 1;
                vec![SessionEffect::Recognize(png)]
            }
            Err(e) => {
                tracing::error!("screen capture failed: {e}");
                self.complete(format!("Error: {e}"), SessionPhase::Error);
                vec![SessionEffect::FinishJob]
            }
        }
    }

    pub fn text_recognized(&mut self, text: String) -> Vec<SessionEffect> {
        let text = text.trim().to_string();
        if text.is_empty() {
            tracing::info!("OCR found no text; skipping model request");
            self.state.extracted_text = Some(text);
            self.complete(NO_TEXT_MESSAGE.to_string(), SessionPhase::Result);
            return vec![SessionEffect::FinishJob];
        }

        tracing::debug!(chars = text.len(), "text extracted");
        self.state.extracted_text = Some(text.clone());
        self.set_phase(SessionPhase::Loading);
        vec![SessionEffect::Ask {
            context: text,
            query: self.state.user_query.clone(),
        }]
    }

    pub fn answer_received(&mut self, result: Result<String, ModelError>) {
        match result {
            Ok(answer) => self.complete(answer, SessionPhase::Result),
            Err(e) => {
                tracing::error!("model request failed: {e}");
                self.complete(format!("Error: {e}"), SessionPhase::Error);
            }
        }
    }

    /// Re-run the model with the current query over the text already
    /// extracted. Ignored unless a result or error is on display.
    pub fn submit_query(&mut self) -> Vec<SessionEffect> {
        let showing_result = matches!(
            self.state.phase,
            SessionPhase::Result | SessionPhase::Error
        );
        let context = match &self.state.extracted_text {
            Some(text) if showing_result && !text.is_empty() => text.clone(),
            _ => {
                tracing::debug!(phase = %self.state.phase, "submit ignored");
                return Vec::new();
            }
        };

        self.state.is_loading = true;
        self.state.result_text = None;
        self.set_phase(SessionPhase::Loading);
        vec![SessionEffect::AskAgain {
            context,
            query: self.state.user_query.clone(),
        }]
    }

    fn complete(&mut self, text: String, phase: SessionPhase) {
        self.state.result_text = Some(text);
        self.state.is_loading = false;
        self.set_phase(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapsed_results_keep_phase() {
        let mut sm = SessionStateMachine::new();
        sm.toggle_analysis();
        sm.toggle_analysis();
        sm.capture_finished(Ok(vec![1]));
        sm.text_recognized("x".into());
        sm.answer_received(Ok("late".into()));
        assert_eq!(sm.phase(), SessionPhase::Collapsed);
        assert_eq!(sm.state().result_text.as_deref(), Some("late"));
        assert!(!sm.state().is_loading);
    }

    #[test]
    fn submit_needs_text() {
        let mut sm = SessionStateMachine::new();
        sm.toggle_analysis();
        sm.capture_finished(Ok(vec![1]));
        sm.text_recognized("   ".into());
        assert_eq!(sm.phase(), SessionPhase::Result);
        assert!(sm.submit_query().is_empty());
    }

    #[test]
    fn equal_length_captures_get_distinct_seq() {
        let mut sm = SessionStateMachine::new();
        sm.toggle_analysis();
        sm.capture_finished(Ok(vec![1, 2, 3]));
        let first = sm.state().capture_seq;
        sm.toggle_analysis();
        sm.toggle_analysis();
        sm.capture_finished(Ok(vec![4, 5, 6]));
        assert_ne!(sm.state().capture_seq, first);
        assert_eq!(sm.state().captured_image.as_deref(), Some(&[4, 5, 6][..]));
    }
}
