//! Energy-based utterance endpointing
//!
//! Splits the microphone stream into utterances: speech starts when RMS
//! energy crosses the threshold and ends after a run of silence.

/// Default minimum RMS energy considered speech
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech for a complete segment (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration that ends an utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Headroom applied over the measured ambient noise floor
const AMBIENT_MULTIPLIER: f32 = 1.5;

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech
    Idle,
    /// Speech started, accumulating
    Speaking,
    /// Speech followed by enough silence
    Complete,
}

/// Detects the start and end of an utterance
#[derive(Debug)]
pub struct SpeechDetector {
    threshold: f32,
    state: EndpointState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for SpeechDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ENERGY_THRESHOLD)
    }
}

impl SpeechDetector {
    /// Create a detector with an explicit energy threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: EndpointState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Raise the threshold above a measured noise floor
    ///
    /// Never drops below the default threshold.
    pub fn calibrate(&mut self, ambient: &[f32]) {
        let floor = rms(ambient);
        self.threshold = (floor * AMBIENT_MULTIPLIER).max(DEFAULT_ENERGY_THRESHOLD);
        tracing::debug!(floor, threshold = self.threshold, "calibrated for ambient noise");
    }

    /// Feed a chunk of samples and return the new state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            EndpointState::Idle => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    if self.speech_buffer.len() > MIN_SPEECH_SAMPLES + self.silence_counter {
                        tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                        self.state = EndpointState::Complete;
                    } else {
                        // Blip too short to be speech
                        tracing::trace!("discarding short noise burst");
                        self.reset();
                    }
                }
            }
            EndpointState::Complete => {}
        }

        self.state
    }

    /// Take the accumulated utterance, returning the detector to idle
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let utterance = std::mem::take(&mut self.speech_buffer);
        self.reset();
        utterance
    }

    /// Samples accumulated so far
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Reset to idle
    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Calculate RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
