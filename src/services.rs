//! Collaborator contracts consumed by the turn controller
//!
//! Capture + recognition, language-model completion and speech synthesis are
//! black boxes behind these traits. Futures are not required to be `Send`:
//! the dialogue loop runs on a single thread and audio handles are
//! thread-bound.

use std::time::Duration;

use async_trait::async_trait;

use crate::conversation::Turn;
use crate::error::FailureKind;
use crate::Result;

/// What the recognizer is listening for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Dormant: only the wake phrase (or a restart) matters
    Wake,
    /// Engaged: the utterance is a command for the assistant
    Command,
}

impl ListenMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Command => "command",
        }
    }
}

/// Bounds for a single listen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenParams {
    /// How long to wait for speech to start
    pub timeout: Duration,
    /// Longest phrase captured once speech has started
    pub phrase_time_limit: Duration,
}

impl Default for ListenParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            phrase_time_limit: Duration::from_secs(10),
        }
    }
}

/// Result of one listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Recognized text, lowercased and whitespace-normalized
    Heard(String),
    /// No speech began before the timeout
    TimedOut,
    /// Speech was captured but could not be transcribed
    Unintelligible,
    /// Capture or recognition service failed
    ServiceError(String),
}

impl ListenOutcome {
    /// The failure this outcome represents, if any
    #[must_use]
    pub const fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Heard(_) => None,
            Self::TimedOut => Some(FailureKind::RecognitionTimeout),
            Self::Unintelligible => Some(FailureKind::RecognitionUnintelligible),
            Self::ServiceError(_) => Some(FailureKind::RecognitionService),
        }
    }
}

/// Capture + speech recognition
#[async_trait(?Send)]
pub trait Recognizer {
    /// Listen for one utterance
    async fn listen(&mut self, mode: ListenMode, params: ListenParams) -> ListenOutcome;
}

/// Language-model completion
#[async_trait(?Send)]
pub trait CompletionEngine {
    /// Complete the conversation, returning the assistant's reply
    ///
    /// # Errors
    ///
    /// Returns error if the engine is unreachable or answers without content
    async fn complete(&self, turns: &[Turn]) -> Result<String>;
}

/// Speech synthesis + playback
#[async_trait(?Send)]
pub trait Synthesizer {
    /// Speak text, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}
