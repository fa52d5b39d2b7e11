//! Microphone capture into a bounded sample ring
//!
//! The input stream only runs between `start` and `stop`, so nothing piles
//! up while the assistant is thinking or speaking. Multi-channel devices are
//! downmixed to mono in the audio callback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};

use super::SampleSource;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Mono samples shared with the audio callback; the oldest are dropped when full
#[derive(Debug, Clone)]
struct SampleRing {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append interleaved frames, averaging channels down to mono
    #[allow(clippy::cast_precision_loss)]
    fn push_frames(&self, data: &[f32], channels: usize) {
        let Ok(mut ring) = self.samples.lock() else {
            return;
        };

        for frame in data.chunks(channels.max(1)) {
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(frame.iter().sum::<f32>() / frame.len() as f32);
        }
    }

    fn drain(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|mut ring| ring.drain(..).collect())
            .unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut ring) = self.samples.lock() {
            ring.clear();
        }
    }
}

/// Number of capture-rate samples covering a duration
fn samples_for(duration: Duration) -> usize {
    usize::try_from(duration.as_millis() * u128::from(SAMPLE_RATE) / 1000).unwrap_or(usize::MAX)
}

/// Records the default input device at 16kHz mono
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    ring: SampleRing,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device, holding at most `max_buffered` of audio
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it cannot record 16kHz f32
    pub fn new(max_buffered: Duration) -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let rate = SampleRate(SAMPLE_RATE);
        let config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| {
                c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| {
                Error::Audio(format!("input device cannot record {SAMPLE_RATE} Hz f32"))
            })?
            .with_sample_rate(rate)
            .config();

        let capacity = samples_for(max_buffered);
        tracing::debug!(
            device = device.name().unwrap_or_default(),
            channels = config.channels,
            capacity,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            ring: SampleRing::new(capacity),
            stream: None,
        })
    }
}

impl SampleSource for AudioCapture {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let ring = self.ring.clone();
        let channels = usize::from(self.config.channels);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| ring.push_frames(data, channels),
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        self.stream = Some(stream);
        tracing::trace!("microphone recording");
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            self.ring.clear();
            tracing::trace!("microphone paused");
        }
    }

    fn drain(&mut self) -> Vec<f32> {
        self.ring.drain()
    }
}

/// Convert f32 samples to 16-bit mono WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = std::io::Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer =
        hound::WavWriter::new(&mut wav, spec).map_err(|e| Error::Audio(e.to_string()))?;
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer
            .write_sample(pcm)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }
    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;

    Ok(wav.into_inner())
}

/// Duration of a sample count at the capture rate, in milliseconds
#[must_use]
pub fn samples_to_millis(samples: usize) -> u64 {
    (samples as u64 * 1000) / u64::from(SAMPLE_RATE)
}
