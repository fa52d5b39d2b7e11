//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use parley::voice::{
    DEFAULT_ENERGY_THRESHOLD, EndpointState, SAMPLE_RATE, SpeechDetector, WakeGate, decode_mp3,
    normalize_transcript, resample, rms, samples_to_millis, samples_to_wav,
};

mod common;
use common::{generate_silence, generate_sine_samples};

#[test]
fn test_wake_gate_substring_match() {
    let gate = WakeGate::new("alice").unwrap();

    assert!(gate.accepts("alice"));
    assert!(gate.accepts("hey alice what's up"));
    assert!(!gate.accepts("hello bob"));
    assert!(!gate.accepts(""));
}

#[test]
fn test_wake_gate_normalizes_phrase() {
    let gate = WakeGate::new("  Hey ALICE ").unwrap();
    assert_eq!(gate.phrase(), "hey alice");

    // Transcripts arrive normalized from recognition
    assert!(gate.accepts(&normalize_transcript("HEY   Alice, are you there?")));
}

#[test]
fn test_wake_gate_rejects_blank_phrase() {
    assert!(WakeGate::new("   ").is_err());
}

#[test]
fn test_silence_stays_idle() {
    let mut detector = SpeechDetector::default();

    let silence = generate_silence(0.5);
    assert_eq!(detector.process(&silence), EndpointState::Idle);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_speech_then_silence_completes() {
    let mut detector = SpeechDetector::default();

    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert_eq!(detector.process(&speech), EndpointState::Speaking);

    // Not complete without trailing silence
    let more_speech = generate_sine_samples(440.0, 0.3, 0.3);
    assert_eq!(detector.process(&more_speech), EndpointState::Speaking);

    let silence = generate_silence(0.6);
    assert_eq!(detector.process(&silence), EndpointState::Complete);

    let utterance = detector.take_utterance();
    assert_eq!(utterance.len(), speech.len() + more_speech.len() + silence.len());
    assert_eq!(detector.state(), EndpointState::Idle);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_short_burst_discarded() {
    let mut detector = SpeechDetector::default();

    let click = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&click);

    let silence = generate_silence(0.6);
    assert_eq!(detector.process(&silence), EndpointState::Idle);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_speech_buffer_accumulation() {
    let mut detector = SpeechDetector::default();

    let chunk1 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk1);

    let chunk2 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk2);

    assert_eq!(detector.speech_buffer().len(), chunk1.len() + chunk2.len());
}

#[test]
fn test_calibration_raises_threshold() {
    let mut detector = SpeechDetector::default();

    // Room hum loud enough to count as speech at the default threshold
    let hum = generate_sine_samples(60.0, 1.0, 0.1);
    detector.calibrate(&hum);
    assert!(detector.threshold() > rms(&hum));

    assert_eq!(detector.process(&hum[..1600]), EndpointState::Idle);

    // Quiet room never lowers the threshold below the default
    let mut quiet = SpeechDetector::default();
    quiet.calibrate(&generate_silence(1.0));
    assert!((quiet.threshold() - DEFAULT_ENERGY_THRESHOLD).abs() < f32::EPSILON);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV header is 44 bytes
    assert!(wav_data.len() > 44);
}

#[test]
fn test_wav_readable() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}

#[test]
fn test_samples_to_millis() {
    assert_eq!(samples_to_millis(SAMPLE_RATE as usize), 1000);
    assert_eq!(samples_to_millis(8000), 500);
}

#[test]
fn test_resample_to_device_rate() {
    let tone = generate_sine_samples(440.0, 1.0, 0.3);
    let output = resample(&tone, SAMPLE_RATE, 48_000).unwrap();

    // Three times as many samples, plus padding from the final chunk
    assert!(output.len() >= 48_000);
    assert!(output.len() < 48_000 + 8192);
}

#[test]
fn test_decode_mp3_rejects_non_audio() {
    assert!(decode_mp3(b"definitely not an mp3 file").is_err());
    assert!(decode_mp3(&[]).is_err());
}
