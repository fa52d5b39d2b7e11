//! Command classification for recognized utterances

use crate::services::ListenOutcome;

/// Marker placed in front of vision requests for the downstream vision path
pub const VISION_TAG: &str = "[vision_request] ";

/// Phrases routed to the vision path
const VISION_TRIGGERS: [&str; 2] = ["look at", "what do you see"];

/// Keyword that clears the conversation
const RESTART_KEYWORD: &str = "restart";

/// Classified purpose of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Ordinary conversational input
    Chat(String),
    /// Request about what the assistant can see
    VisionRequest(String),
    /// Clear the conversation and go dormant
    Restart,
    /// Nothing usable was heard
    Unintelligible,
    /// Recognition service failed
    ServiceError,
}

impl Intent {
    /// Map a listen outcome to an intent
    #[must_use]
    pub fn from_outcome(outcome: &ListenOutcome) -> Self {
        match outcome {
            ListenOutcome::Heard(text) if text.trim().is_empty() => Self::Unintelligible,
            ListenOutcome::Heard(text) => classify(text),
            ListenOutcome::TimedOut | ListenOutcome::Unintelligible => Self::Unintelligible,
            ListenOutcome::ServiceError(_) => Self::ServiceError,
        }
    }

    /// Content for the user turn, tagged when the request needs vision
    #[must_use]
    pub fn user_content(&self) -> Option<String> {
        match self {
            Self::Chat(text) => Some(text.clone()),
            Self::VisionRequest(text) => Some(tag_vision(text)),
            Self::Restart | Self::Unintelligible | Self::ServiceError => None,
        }
    }
}

/// Classify a lowercased, non-empty utterance
///
/// Restart wins over everything else so that it is honored even while only
/// the wake phrase was expected.
#[must_use]
pub fn classify(utterance: &str) -> Intent {
    if utterance.contains(RESTART_KEYWORD) {
        return Intent::Restart;
    }

    if VISION_TRIGGERS.iter().any(|t| utterance.contains(t)) {
        return Intent::VisionRequest(utterance.to_string());
    }

    Intent::Chat(utterance.to_string())
}

/// Mark text as a vision request
#[must_use]
pub fn tag_vision(text: &str) -> String {
    format!("{VISION_TAG}{text}")
}

/// Recover the literal request from tagged content
#[must_use]
pub fn untag_vision(content: &str) -> Option<&str> {
    content.strip_prefix(VISION_TAG)
}
