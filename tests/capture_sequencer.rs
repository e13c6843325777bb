use std::time::Duration;

use glassbar::capture::{CaptureEvent, CaptureSequencer, CaptureStage, SequencerStep, StepOutcome};
use glassbar::mailbox::{unwoken_channel, ControlMessage};

#[path = "fakes.rs"]
mod fakes;
use fakes::{FakeDisplay, FakeModel, FakeOcr};

fn sequencer() -> (CaptureSequencer, std::sync::mpsc::Receiver<ControlMessage>) {
    let (mailbox, rx) = unwoken_channel();
    let seq = CaptureSequencer::new(
        mailbox,
        FakeDisplay::ok(),
        FakeOcr::returning("text"),
        FakeModel::answering("answer"),
        Duration::from_millis(10),
    );
    (seq, rx)
}

fn next_event(rx: &std::sync::mpsc::Receiver<ControlMessage>) -> CaptureEvent {
    match rx.recv_timeout(Duration::from_secs(5)).expect("worker result") {
        ControlMessage::Capture(ev) => ev,
        other => panic!("unexpected message {other:?}"),
    }
}

#[test]
fn second_begin_while_capturing_is_deferred() {
    let (mut seq, rx) = sequencer();
    let first = seq.begin().expect("first cycle starts");
    assert!(seq.is_capturing());
    assert_eq!(seq.begin(), None);
    assert!(seq.is_deferred());

    let ev = next_event(&rx);
    assert_eq!(ev.job, first);
    assert!(matches!(seq.on_event(ev), SequencerStep::Resume));
    assert!(seq.current().is_none());

    let second = seq.begin().expect("display is free again");
    assert!(second > first);
    assert!(!seq.is_deferred());
}

#[test]
fn superseded_results_are_stale() {
    let (mut seq, rx) = sequencer();
    let first = seq.begin().unwrap();
    let ev = next_event(&rx);
    let SequencerStep::Captured(Ok(png)) = seq.on_event(ev) else {
        panic!("expected a capture");
    };
    seq.recognize(png);
    assert_eq!(seq.current().map(|j| j.stage), Some(CaptureStage::Recognizing));

    let second = seq.ask_again("text".into(), "again".into());
    assert_ne!(first, second);

    // both the OCR result of the first job and the answer of the second arrive
    let mut stale = 0;
    let mut answered = 0;
    for _ in 0..2 {
        match seq.on_event(next_event(&rx)) {
            SequencerStep::Stale => stale += 1,
            SequencerStep::Answered(Ok(a)) => {
                assert_eq!(a, "answer");
                answered += 1;
            }
            other => panic!("unexpected step {other:?}"),
        }
    }
    assert_eq!((stale, answered), (1, 1));
    assert!(seq.current().is_none());
}

#[test]
fn late_event_for_unknown_job_is_stale() {
    let (mut seq, _rx) = sequencer();
    let step = seq.on_event(CaptureEvent {
        job: 42,
        outcome: StepOutcome::Recognized("late".into()),
    });
    assert!(matches!(step, SequencerStep::Stale));
}
