//! Voice processing module
//!
//! Concrete collaborators behind the service contracts: microphone capture
//! with energy endpointing, wake phrase gating, STT, TTS and playback.

mod capture;
mod endpoint;
mod listener;
mod playback;
mod speaker;
mod stt;
mod tts;
mod wake_word;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_millis, samples_to_wav};
pub use endpoint::{DEFAULT_ENERGY_THRESHOLD, EndpointState, SpeechDetector, rms};
pub use listener::{MicrophoneListener, SampleSource, Transcriber};
pub use playback::{AudioPlayback, decode_mp3, resample};
pub use speaker::VoiceOutput;
pub use stt::{SpeechToText, normalize_transcript};
pub use tts::{TextToSpeech, VoiceSettings};
pub use wake_word::WakeGate;
