//! Turn controller: the wake-gated dialogue state machine
//!
//! The controller owns the conversation context and drives the
//! listen → classify → complete → speak cycle:
//!
//! ```text
//!                 wake phrase heard
//!   AwaitingWake ──────────────────▶ ack, listen(Command) ──▶ Active
//!        ▲                                                      │
//!        │   restart / no command                               │ chat, vision
//!        └──────────────────────────────────────────────────────┤
//!                                                               ▼
//!                                              complete, speak, stay Active
//! ```
//!
//! Every step is sequential: speaking finishes before the next listen.

use tokio::sync::mpsc;

use crate::config::Config;
use crate::conversation::{ConversationContext, Turn};
use crate::error::FailureKind;
use crate::intent::Intent;
use crate::services::{
    CompletionEngine, ListenMode, ListenOutcome, ListenParams, Recognizer, Synthesizer,
};
use crate::voice::WakeGate;

/// Whether the assistant is waiting for its wake phrase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Dormant until the wake phrase (or a restart) is heard
    #[default]
    AwaitingWake,
    /// Engaged: utterances go straight to the language model
    Active,
}

/// What a single cycle accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing addressed to the assistant
    Idle,
    /// Engaged but no command followed, back to waiting
    NoCommand,
    /// Context cleared
    Restarted,
    /// Assistant reply appended and spoken
    Responded,
    /// A service failed and the cycle was skipped
    Failed(FailureKind),
}

/// Phrases and bounds the controller works with
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub acknowledgement: String,
    pub restart_confirmation: String,
    pub listen: ListenParams,
    pub failure_warn_threshold: u32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            acknowledgement: "How you doing?".to_string(),
            restart_confirmation: "I just cleared the context window".to_string(),
            listen: ListenParams::default(),
            failure_warn_threshold: 3,
        }
    }
}

impl TurnSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            acknowledgement: config.dialogue.acknowledgement.clone(),
            restart_confirmation: config.dialogue.restart_confirmation.clone(),
            listen: config.listen.params(),
            failure_warn_threshold: config.dialogue.failure_warn_threshold,
        }
    }
}

/// Counts consecutive service failures of one kind
#[derive(Debug, Clone)]
pub struct FailureTracker {
    threshold: u32,
    kind: Option<FailureKind>,
    streak: u32,
}

impl FailureTracker {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold: if threshold == 0 { 1 } else { threshold },
            kind: None,
            streak: 0,
        }
    }

    /// Record a failure, warning when the streak reaches a multiple of the threshold
    ///
    /// Returns `true` when a warning was emitted. Non-service failures
    /// (timeouts, unintelligible audio) are ignored.
    pub fn record(&mut self, kind: FailureKind) -> bool {
        if !kind.is_service() {
            return false;
        }

        if self.kind == Some(kind) {
            self.streak += 1;
        } else {
            self.kind = Some(kind);
            self.streak = 1;
        }

        let warn = self.streak % self.threshold == 0;
        if warn {
            tracing::warn!(kind = %kind, streak = self.streak, "service keeps failing");
        }
        warn
    }

    /// A successful call of this kind ends its streak
    pub fn succeeded(&mut self, kind: FailureKind) {
        if self.kind == Some(kind) {
            self.kind = None;
            self.streak = 0;
        }
    }

    #[must_use]
    pub const fn kind(&self) -> Option<FailureKind> {
        self.kind
    }

    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }
}

/// Drives the dialogue over a recognizer, completion engine and synthesizer
pub struct TurnController<R, C, S> {
    recognizer: R,
    engine: C,
    speaker: S,
    gate: WakeGate,
    context: ConversationContext,
    state: SessionState,
    settings: TurnSettings,
    failures: FailureTracker,
}

impl<R, C, S> TurnController<R, C, S>
where
    R: Recognizer,
    C: CompletionEngine,
    S: Synthesizer,
{
    pub fn new(
        recognizer: R,
        engine: C,
        speaker: S,
        gate: WakeGate,
        persona_prompt: impl Into<String>,
        settings: TurnSettings,
    ) -> Self {
        let failures = FailureTracker::new(settings.failure_warn_threshold);
        Self {
            recognizer,
            engine,
            speaker,
            gate,
            context: ConversationContext::new(persona_prompt),
            state: SessionState::AwaitingWake,
            settings,
            failures,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn context(&self) -> &ConversationContext {
        &self.context
    }

    #[must_use]
    pub const fn failures(&self) -> &FailureTracker {
        &self.failures
    }

    #[must_use]
    pub const fn recognizer(&self) -> &R {
        &self.recognizer
    }

    #[must_use]
    pub const fn engine(&self) -> &C {
        &self.engine
    }

    #[must_use]
    pub const fn speaker(&self) -> &S {
        &self.speaker
    }

    /// Run cycles until shutdown fires
    ///
    /// Shutdown drops whatever the current cycle is awaiting. A closed
    /// channel counts as shutdown.
    pub async fn run(&mut self, shutdown: &mut mpsc::Receiver<()>) {
        tracing::info!(wake_phrase = %self.gate.phrase(), "listening for wake phrase");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                outcome = self.step() => {
                    tracing::debug!(?outcome, state = ?self.state, "cycle complete");
                }
            }
        }

        tracing::info!(turns = self.context.len(), "dialogue loop stopped");
    }

    /// Run one listen cycle
    pub async fn step(&mut self) -> CycleOutcome {
        match self.state {
            SessionState::AwaitingWake => self.await_wake().await,
            SessionState::Active => {
                let outcome = self.listen(ListenMode::Command).await;
                self.handle_command(&outcome).await
            }
        }
    }

    async fn await_wake(&mut self) -> CycleOutcome {
        let outcome = self.listen(ListenMode::Wake).await;

        let ListenOutcome::Heard(text) = &outcome else {
            return match outcome.failure() {
                Some(kind) if kind.is_service() => CycleOutcome::Failed(kind),
                _ => CycleOutcome::Idle,
            };
        };

        if Intent::from_outcome(&outcome) == Intent::Restart {
            return self.restart().await;
        }

        if !self.gate.accepts(text) {
            tracing::debug!(transcript = %text, "not addressed to assistant");
            return CycleOutcome::Idle;
        }

        let acknowledgement = self.settings.acknowledgement.clone();
        self.say(&acknowledgement).await;

        let command = self.listen(ListenMode::Command).await;
        self.handle_command(&command).await
    }

    async fn handle_command(&mut self, outcome: &ListenOutcome) -> CycleOutcome {
        let intent = Intent::from_outcome(outcome);

        if let Some(content) = intent.user_content() {
            return self.converse(content).await;
        }

        if intent == Intent::Restart {
            return self.restart().await;
        }

        tracing::info!("no command heard, waiting for wake phrase");
        self.state = SessionState::AwaitingWake;
        match outcome.failure() {
            Some(kind) if kind.is_service() => CycleOutcome::Failed(kind),
            _ => CycleOutcome::NoCommand,
        }
    }

    async fn converse(&mut self, content: String) -> CycleOutcome {
        tracing::info!(command = %content, "user said");
        self.context.append(Turn::user(content));
        self.state = SessionState::Active;

        let reply = match self.engine.complete(self.context.snapshot()).await {
            Ok(reply) => {
                self.failures.succeeded(FailureKind::CompletionService);
                reply
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion failed, skipping turn");
                self.context.retract_last();
                self.failures.record(FailureKind::CompletionService);
                return CycleOutcome::Failed(FailureKind::CompletionService);
            }
        };

        self.context.append(Turn::assistant(reply.as_str()));
        self.say(&reply).await;
        CycleOutcome::Responded
    }

    async fn restart(&mut self) -> CycleOutcome {
        tracing::info!(dropped_turns = self.context.len() - 1, "restarting conversation");
        self.context.reset();
        self.state = SessionState::AwaitingWake;

        let confirmation = self.settings.restart_confirmation.clone();
        self.say(&confirmation).await;
        CycleOutcome::Restarted
    }

    async fn listen(&mut self, mode: ListenMode) -> ListenOutcome {
        let outcome = self.recognizer.listen(mode, self.settings.listen).await;

        match &outcome {
            ListenOutcome::Heard(text) => {
                tracing::debug!(mode = mode.as_str(), transcript = %text, "heard");
                self.failures.succeeded(FailureKind::RecognitionService);
            }
            ListenOutcome::TimedOut => {
                tracing::debug!(mode = mode.as_str(), "no speech before timeout");
            }
            ListenOutcome::Unintelligible => {
                tracing::warn!(mode = mode.as_str(), "could not understand audio");
            }
            ListenOutcome::ServiceError(detail) => {
                tracing::warn!(mode = mode.as_str(), error = %detail, "speech recognition failed");
                self.failures.record(FailureKind::RecognitionService);
            }
        }

        outcome
    }

    async fn say(&mut self, text: &str) {
        match self.speaker.speak(text).await {
            Ok(()) => self.failures.succeeded(FailureKind::SynthesisService),
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                self.failures.record(FailureKind::SynthesisService);
            }
        }
    }
}
