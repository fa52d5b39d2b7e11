//! Shared test utilities
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;

use parley::voice::{SAMPLE_RATE, WakeGate};
use parley::{
    CompletionEngine, Error, ListenMode, ListenOutcome, ListenParams, Recognizer, Result,
    Synthesizer, Turn, TurnController, TurnSettings,
};

/// Ordered record of collaborator calls shared by the fakes
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub const PERSONA: &str = "You are a voice assistant named alice.";

/// Recognizer that replays a script, then waits forever
pub struct ScriptedRecognizer {
    script: VecDeque<ListenOutcome>,
    pub modes: Vec<ListenMode>,
    log: CallLog,
}

#[async_trait(?Send)]
impl Recognizer for ScriptedRecognizer {
    async fn listen(&mut self, mode: ListenMode, _params: ListenParams) -> ListenOutcome {
        self.modes.push(mode);
        self.log.borrow_mut().push(format!("listen:{}", mode.as_str()));
        match self.script.pop_front() {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

/// Completion engine with canned replies that records every transcript it receives
pub struct ScriptedEngine {
    replies: RefCell<VecDeque<Result<String>>>,
    pub received: RefCell<Vec<Vec<Turn>>>,
    log: CallLog,
}

#[async_trait(?Send)]
impl CompletionEngine for ScriptedEngine {
    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        self.received.borrow_mut().push(turns.to_vec());
        self.log.borrow_mut().push(format!("complete:{}", turns.len()));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Completion("no reply scripted".to_string())))
    }
}

/// Synthesizer that records what it was asked to say
pub struct RecordingSpeaker {
    pub spoken: Vec<String>,
    pub fail: bool,
    log: CallLog,
}

#[async_trait(?Send)]
impl Synthesizer for RecordingSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("speak:{text}"));
        if self.fail {
            return Err(Error::Tts("speaker offline".to_string()));
        }
        self.spoken.push(text.to_string());
        Ok(())
    }
}

pub type TestController = TurnController<ScriptedRecognizer, ScriptedEngine, RecordingSpeaker>;

/// Build a controller woken by "alice" with scripted collaborators
pub fn controller(
    heard: Vec<ListenOutcome>,
    replies: Vec<Result<String>>,
    speaker_fails: bool,
) -> (TestController, CallLog) {
    let log = CallLog::default();

    let recognizer = ScriptedRecognizer {
        script: heard.into(),
        modes: Vec::new(),
        log: Rc::clone(&log),
    };
    let engine = ScriptedEngine {
        replies: RefCell::new(replies.into()),
        received: RefCell::new(Vec::new()),
        log: Rc::clone(&log),
    };
    let speaker = RecordingSpeaker {
        spoken: Vec::new(),
        fail: speaker_fails,
        log: Rc::clone(&log),
    };

    let controller = TurnController::new(
        recognizer,
        engine,
        speaker,
        WakeGate::new("alice").expect("valid wake phrase"),
        PERSONA,
        TurnSettings::default(),
    );
    (controller, log)
}

pub fn heard(text: &str) -> ListenOutcome {
    ListenOutcome::Heard(text.to_string())
}

/// Generate sine wave audio samples
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}
