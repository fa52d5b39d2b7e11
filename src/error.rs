//! Error types for Parley

use std::fmt;

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Parley
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language-model completion error
    #[error("completion error: {0}")]
    Completion(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Recoverable failures observed by the turn controller
///
/// None of these end the dialogue loop; each downgrades the current cycle
/// to a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No speech started before the listen timeout elapsed
    RecognitionTimeout,
    /// Speech was captured but nothing usable was transcribed
    RecognitionUnintelligible,
    /// The capture or transcription service failed
    RecognitionService,
    /// The language-model engine failed
    CompletionService,
    /// Speech synthesis or playback failed
    SynthesisService,
}

impl FailureKind {
    /// Whether this failure came from an external service rather than the user
    #[must_use]
    pub const fn is_service(self) -> bool {
        matches!(
            self,
            Self::RecognitionService | Self::CompletionService | Self::SynthesisService
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RecognitionTimeout => "recognition timeout",
            Self::RecognitionUnintelligible => "recognition unintelligible",
            Self::RecognitionService => "recognition service",
            Self::CompletionService => "completion service",
            Self::SynthesisService => "synthesis service",
        };
        f.write_str(name)
    }
}
