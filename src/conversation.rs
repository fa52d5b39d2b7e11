//! Conversation transcript
//!
//! Holds the ordered turns submitted to the language model. The first turn
//! is always the persona system prompt and survives every reset.

use serde::{Deserialize, Serialize};

/// Speaker role of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One utterance or response in the transcript
///
/// Fields are private so a turn cannot change once it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Create a turn with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered, append-only transcript anchored by a persona turn
#[derive(Debug, Clone)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    /// Start a conversation containing only the persona prompt
    pub fn new(persona_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(persona_prompt)],
        }
    }

    /// Drop everything except the persona turn
    pub fn reset(&mut self) {
        self.turns.truncate(1);
        tracing::debug!("conversation context reset");
    }

    /// Add a turn at the end of the transcript
    pub fn append(&mut self, turn: Turn) {
        tracing::trace!(role = turn.role.as_str(), len = self.turns.len() + 1, "turn appended");
        self.turns.push(turn);
    }

    /// Withdraw the most recent turn; the persona turn is never removed
    pub(crate) fn retract_last(&mut self) -> Option<Turn> {
        if self.turns.len() <= 1 {
            return None;
        }
        let turn = self.turns.pop();
        tracing::trace!(len = self.turns.len(), "turn retracted");
        turn
    }

    /// The full ordered transcript
    #[must_use]
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// The persona system turn
    #[must_use]
    pub fn persona(&self) -> &Turn {
        // `new` always seeds the persona and `reset` never removes it
        &self.turns[0]
    }

    /// Most recent turn
    #[must_use]
    pub fn last(&self) -> &Turn {
        self.turns.last().unwrap_or_else(|| self.persona())
    }

    /// Number of turns including the persona
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the persona turn is permanent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Build the persona prompt for a named voice assistant
#[must_use]
pub fn voice_persona_prompt(name: &str) -> String {
    format!(
        "You are a voice assistant named {name}. Your responses should be short and \
         suitable for speech, using conversational phrases. Avoid text-only tokens."
    )
}
