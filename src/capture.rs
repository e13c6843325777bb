use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::mailbox::{ControlMessage, Mailbox};
use crate::model::{ModelClient, ModelError};
use crate::ocr::TextRecognizer;
use crate::screen::{archive_capture, CaptureError, DisplayCapture};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    /// Panel parked off screen; waiting for the compositor, then capturing.
    Capturing,
    Recognizing,
    Asking,
}

/// One analysis cycle.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub id: JobId,
    pub requested_at: DateTime<Local>,
    pub steps_completed: u32,
    pub stage: CaptureStage,
}

#[derive(Debug)]
pub enum StepOutcome {
    Captured(Result<Vec<u8>, CaptureError>),
    Recognized(String),
    Answered(Result<String, ModelError>),
}

/// A worker's result for `job`, posted back to the control thread.
#[derive(Debug)]
pub struct CaptureEvent {
    pub job: JobId,
    pub outcome: StepOutcome,
}

/// What the control thread must do with a worker result.
#[derive(Debug)]
pub enum SequencerStep {
    /// Display captured (or failed) for the current job; the panel may
    /// come back.
    Captured(Result<Vec<u8>, CaptureError>),
    Recognized(String),
    Answered(Result<String, ModelError>),
    /// An older capture released the display and a deferred cycle may now
    /// start. The panel stays parked.
    Resume,
    /// Result of a superseded job; ignore it.
    Stale,
}

/// Runs the hide → settle → capture → show → OCR → model chain. Each step
/// runs on a worker thread and the next one is started by the control thread
/// only after the previous result arrived. At most one job is current.
pub struct CaptureSequencer {
    mailbox: Mailbox,
    display: Arc<dyn DisplayCapture>,
    recognizer: Arc<dyn TextRecognizer>,
    model: Arc<dyn ModelClient>,
    settle_delay: Duration,
    archive_dir: Option<PathBuf>,
    next_job: JobId,
    current: Option<CaptureJob>,
    deferred: bool,
}

impl CaptureSequencer {
    pub fn new(
        mailbox: Mailbox,
        display: Arc<dyn DisplayCapture>,
        recognizer: Arc<dyn TextRecognizer>,
        model: Arc<dyn ModelClient>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            mailbox,
            display,
            recognizer,
            model,
            settle_delay,
            archive_dir: None,
            next_job: 1,
            current: None,
            deferred: false,
        }
    }

    pub fn with_archive_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.archive_dir = dir;
        self
    }

    pub fn current(&self) -> Option<&CaptureJob> {
        self.current.as_ref()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// True while the current job holds the display (panel parked).
    pub fn is_capturing(&self) -> bool {
        matches!(
            self.current,
            Some(CaptureJob {
                stage: CaptureStage::Capturing,
                ..
            })
        )
    }

    fn new_job(&mut self, stage: CaptureStage) -> JobId {
        let id = self.next_job;
        self.next_job += 1;
        if let Some(old) = self.current.take() {
            tracing::debug!(job = old.id, "superseded by job {id}");
        }
        self.current = Some(CaptureJob {
            id,
            requested_at: Local::now(),
            steps_completed: 0,
            stage,
        });
        id
    }

    /// Start a new cycle. The caller has already parked the panel. Returns
    /// `None` when an older capture still holds the display; the cycle then
    /// begins once [`SequencerStep::Resume`] is reported.
    pub fn begin(&mut self) -> Option<JobId> {
        if self.is_capturing() {
            tracing::debug!("display busy with an earlier capture; deferring new cycle");
            self.deferred = true;
            return None;
        }
        self.deferred = false;
        let job = self.new_job(CaptureStage::Capturing);
        tracing::info!(job, "analysis cycle started");

        let mailbox = self.mailbox.clone();
        let display = self.display.clone();
        let settle = self.settle_delay;
        thread::spawn(move || {
            thread::sleep(settle);
            let result = display.capture_display();
            mailbox.send(ControlMessage::Capture(CaptureEvent {
                job,
                outcome: StepOutcome::Captured(result),
            }));
        });
        Some(job)
    }

    /// Run OCR on the current job's image.
    pub fn recognize(&mut self, png: Vec<u8>) {
        let Some(job) = self.advance_to(CaptureStage::Recognizing) else {
            return;
        };
        if let Some(dir) = self.archive_dir.clone() {
            match archive_capture(&dir, &png) {
                Ok(path) => tracing::debug!(job, "capture archived to {}", path.display()),
                Err(e) => tracing::warn!(job, "failed to archive capture: {e}"),
            }
        }
        let mailbox = self.mailbox.clone();
        let recognizer = self.recognizer.clone();
        thread::spawn(move || {
            let text = match recognizer.recognize(&png) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(job, "OCR failed, treating as no text: {e}");
                    String::new()
                }
            };
            mailbox.send(ControlMessage::Capture(CaptureEvent {
                job,
                outcome: StepOutcome::Recognized(text),
            }));
        });
    }

    /// Ask the model about the current job's text.
    pub fn ask(&mut self, context: String, query: String) {
        let Some(job) = self.advance_to(CaptureStage::Asking) else {
            return;
        };
        self.spawn_ask(job, context, query);
    }

    /// Ask again about already extracted text, as a new job.
    pub fn ask_again(&mut self, context: String, query: String) -> JobId {
        let job = self.new_job(CaptureStage::Asking);
        tracing::info!(job, "re-running model request");
        self.spawn_ask(job, context, query);
        job
    }

    fn spawn_ask(&self, job: JobId, context: String, query: String) {
        let mailbox = self.mailbox.clone();
        let model = self.model.clone();
        thread::spawn(move || {
            let result = model.ask(&context, &query);
            mailbox.send(ControlMessage::Capture(CaptureEvent {
                job,
                outcome: StepOutcome::Answered(result),
            }));
        });
    }

    fn advance_to(&mut self, stage: CaptureStage) -> Option<JobId> {
        let job = self.current.as_mut()?;
        job.stage = stage;
        job.steps_completed += 1;
        Some(job.id)
    }

    /// The current job is done.
    pub fn finish(&mut self) {
        if let Some(job) = self.current.take() {
            let elapsed = Local::now() - job.requested_at;
            tracing::info!(
                job = job.id,
                steps = job.steps_completed + 1,
                elapsed_ms = elapsed.num_milliseconds(),
                "analysis cycle finished"
            );
        }
    }

    /// Match a worker result against the current job.
    pub fn on_event(&mut self, event: CaptureEvent) -> SequencerStep {
        let is_current = self.current.as_ref().map(|j| j.id) == Some(event.job);
        if !is_current {
            tracing::debug!(job = event.job, "dropping result of superseded job");
            return SequencerStep::Stale;
        }
        match event.outcome {
            StepOutcome::Captured(result) => {
                if self.deferred {
                    tracing::debug!(job = event.job, "discarding capture; a newer cycle is waiting");
                    self.current = None;
                    return SequencerStep::Resume;
                }
                SequencerStep::Captured(result)
            }
            StepOutcome::Recognized(text) => SequencerStep::Recognized(text),
            StepOutcome::Answered(result) => {
                self.finish();
                SequencerStep::Answered(result)
            }
        }
    }
}
