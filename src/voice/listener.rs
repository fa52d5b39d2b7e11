//! Microphone listener: capture, endpointing and transcription
//!
//! Implements the recognizer contract over a sample source and a
//! transcriber. The source records only for the duration of a listen, so
//! the assistant's own speech is never picked up.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{
    AudioCapture, EndpointState, SAMPLE_RATE, SpeechDetector, SpeechToText, samples_to_millis,
    samples_to_wav,
};
use crate::Result;
use crate::services::{ListenMode, ListenOutcome, ListenParams, Recognizer};

/// Capture polling interval
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Utterances shorter than this are not worth sending to STT
const MIN_UTTERANCE_SAMPLES: usize = SAMPLE_RATE as usize / 2;

/// Mono 16kHz audio that can be switched on for a listen
pub trait SampleSource {
    /// Begin recording; a no-op while already recording
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    fn start(&mut self) -> Result<()>;

    /// Stop recording and drop anything buffered
    fn stop(&mut self);

    /// Samples recorded since the previous drain
    fn drain(&mut self) -> Vec<f32>;

    /// Throw away buffered audio
    fn discard(&mut self) {
        self.drain();
    }
}

/// Turns a WAV utterance into normalized text
#[async_trait(?Send)]
pub trait Transcriber {
    /// # Errors
    ///
    /// Returns error if the transcription service fails
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

/// Listens on a sample source and transcribes one utterance per call
pub struct MicrophoneListener<S = AudioCapture, T = SpeechToText> {
    source: S,
    transcriber: T,
    detector: SpeechDetector,
    ambient_window: Duration,
}

impl<S: SampleSource, T: Transcriber> MicrophoneListener<S, T> {
    /// Create a listener
    ///
    /// `ambient_window` is how long to sample background noise before each
    /// wake listen; zero disables calibration.
    #[must_use]
    pub fn new(source: S, transcriber: T, ambient_window: Duration) -> Self {
        Self {
            source,
            transcriber,
            detector: SpeechDetector::default(),
            ambient_window,
        }
    }

    /// Sample background noise and adjust the speech threshold
    async fn calibrate(&mut self) {
        self.source.discard();
        tokio::time::sleep(self.ambient_window).await;
        let ambient = self.source.drain();
        self.detector.calibrate(&ambient);
    }

    /// Capture a single utterance
    ///
    /// Returns `None` if no speech started within the timeout. Speech longer
    /// than the phrase limit is cut off and returned as is. A discarded noise
    /// burst restarts the phrase clock.
    async fn capture_utterance(&mut self, params: ListenParams) -> Option<Vec<f32>> {
        let started = Instant::now();
        let mut speech_started: Option<Instant> = None;

        loop {
            tokio::time::sleep(CHUNK_INTERVAL).await;
            let chunk = self.source.drain();

            match self.detector.process(&chunk) {
                EndpointState::Complete => return Some(self.detector.take_utterance()),
                EndpointState::Speaking => {
                    let since = *speech_started.get_or_insert_with(Instant::now);
                    if since.elapsed() >= params.phrase_time_limit {
                        tracing::debug!("phrase time limit reached");
                        return Some(self.detector.take_utterance());
                    }
                }
                EndpointState::Idle => {
                    speech_started = None;
                    if started.elapsed() >= params.timeout {
                        return None;
                    }
                }
            }
        }
    }

    async fn recognize(&mut self, mode: ListenMode, params: ListenParams) -> ListenOutcome {
        self.detector.reset();
        if mode == ListenMode::Wake && !self.ambient_window.is_zero() {
            self.calibrate().await;
        }
        self.source.discard();

        tracing::info!(mode = mode.as_str(), "listening");

        let Some(samples) = self.capture_utterance(params).await else {
            return ListenOutcome::TimedOut;
        };

        let duration_ms = samples_to_millis(samples.len());
        if samples.len() < MIN_UTTERANCE_SAMPLES {
            tracing::debug!(duration_ms, "utterance too short to transcribe");
            return ListenOutcome::Unintelligible;
        }

        tracing::debug!(duration_ms, "transcribing utterance");
        let transcript = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => self.transcriber.transcribe(&wav).await,
            Err(e) => Err(e),
        };

        match transcript {
            Ok(text) if text.is_empty() => ListenOutcome::Unintelligible,
            Ok(text) => ListenOutcome::Heard(text),
            Err(e) => ListenOutcome::ServiceError(e.to_string()),
        }
    }
}

#[async_trait(?Send)]
impl<S: SampleSource, T: Transcriber> Recognizer for MicrophoneListener<S, T> {
    async fn listen(&mut self, mode: ListenMode, params: ListenParams) -> ListenOutcome {
        if let Err(e) = self.source.start() {
            return ListenOutcome::ServiceError(e.to_string());
        }

        let outcome = self.recognize(mode, params).await;
        self.source.stop();
        outcome
    }
}
