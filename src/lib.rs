//! Parley - Wake-word gated spoken dialogue for AI assistants
//!
//! This library provides the core of the Parley voice assistant:
//! - Conversation context with a fixed persona turn
//! - Wake phrase gating and command classification
//! - The turn controller state machine
//! - Microphone capture, STT, TTS and playback adapters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Turn Controller                     │
//! │   Wake Gate  │  Classifier  │  Conversation Context  │
//! └──────┬──────────────────┬──────────────────┬────────┘
//!        │                  │                  │
//! ┌──────▼───────┐  ┌───────▼────────┐  ┌──────▼───────┐
//! │  Recognizer  │  │ Completion LLM │  │ Synthesizer  │
//! │  mic + STT   │  │ Groq / OpenAI  │  │ TTS + output │
//! └──────────────┘  └────────────────┘  └──────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod llm;
pub mod services;
pub mod voice;

pub use config::Config;
pub use controller::{CycleOutcome, FailureTracker, SessionState, TurnController, TurnSettings};
pub use conversation::{ConversationContext, Role, Turn, voice_persona_prompt};
pub use error::{Error, FailureKind, Result};
pub use intent::{Intent, classify};
pub use llm::ChatClient;
pub use services::{
    CompletionEngine, ListenMode, ListenOutcome, ListenParams, Recognizer, Synthesizer,
};
