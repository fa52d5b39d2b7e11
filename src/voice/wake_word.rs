//! Wake phrase gate
//!
//! Checks transcripts for the configured wake phrase. Any substring match
//! activates: a spurious activation costs one short acknowledgement, a missed
//! one makes the user repeat themselves.

use crate::{Error, Result};

/// Accepts utterances containing the wake phrase
#[derive(Debug, Clone)]
pub struct WakeGate {
    phrase: String,
}

impl WakeGate {
    /// Create a gate for a wake phrase (e.g., "alice")
    ///
    /// # Errors
    ///
    /// Returns error if the phrase is blank
    pub fn new(phrase: &str) -> Result<Self> {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }

        tracing::debug!(wake_phrase = %phrase, "wake gate initialized");
        Ok(Self { phrase })
    }

    /// Check a lowercased transcript for the wake phrase
    #[must_use]
    pub fn accepts(&self, transcript: &str) -> bool {
        let hit = transcript.contains(&self.phrase);
        if hit {
            tracing::info!(wake_phrase = %self.phrase, transcript, "wake phrase detected");
        }
        hit
    }

    /// The normalized wake phrase
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }
}
