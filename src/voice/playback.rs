//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use rubato::{FftFixedInOut, Resampler};

use crate::{Error, Result};

/// How often to check whether playback has drained
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra wait so the device flushes its last buffer
const TAIL_DELAY: Duration = Duration::from_millis(100);

/// Frames per resampler chunk
const RESAMPLE_CHUNK: usize = 1024;

/// Plays mono audio to the default output device
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Open the default output device at its preferred configuration
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { device, config })
    }

    /// Output sample rate of the device
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Play mono f32 samples recorded at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if resampling or playback fails
    pub async fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        let samples = if sample_rate == self.sample_rate() {
            samples
        } else {
            tracing::debug!(from = sample_rate, to = self.sample_rate(), "resampling audio");
            resample(&samples, sample_rate, self.sample_rate())?
        };
        self.play_at_device_rate(samples).await
    }

    /// Play audio from MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&mut self, mp3_data: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_mp3(mp3_data)?;
        self.play(samples, sample_rate).await
    }

    /// Play samples, returning once they have drained
    ///
    /// Completion is polled on the runtime timer so an interrupt can cancel
    /// playback; dropping the future drops the stream and silences output.
    async fn play_at_device_rate(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let channels = usize::from(self.config.channels);
        let sample_count = samples.len();
        let finished = Arc::new(AtomicBool::new(false));
        let finished_cb = Arc::clone(&finished);
        let mut position = 0usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(position).copied().unwrap_or_else(|| {
                            finished_cb.store(true, Ordering::Release);
                            0.0
                        });
                        frame.fill(sample);
                        position = (position + 1).min(samples.len());
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(self.sample_rate());
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();

        while !finished.load(Ordering::Acquire) {
            if start.elapsed() > timeout {
                tracing::warn!(duration_ms, "playback did not drain before timeout");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        tokio::time::sleep(TAIL_DELAY).await;

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate)
                    .map_err(|_| Error::Audio("invalid MP3 sample rate".to_string()))?;

                if frame.channels == 2 {
                    // Downmix stereo by averaging channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("MP3 contained no audio frames".to_string()));
    }

    Ok((samples, sample_rate))
}

/// Resample mono audio between rates
///
/// # Errors
///
/// Returns error if the resampler rejects the rates
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    let mut resampler = FftFixedInOut::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 1)
        .map_err(|e| Error::Audio(format!("resampler setup failed: {e}")))?;

    let expected = samples.len() * to as usize / from.max(1) as usize;
    let mut output = Vec::with_capacity(expected + RESAMPLE_CHUNK);
    let mut offset = 0;

    while offset < samples.len() {
        let needed = resampler.input_frames_next();
        let end = (offset + needed).min(samples.len());

        let mut chunk = samples[offset..end].to_vec();
        chunk.resize(needed, 0.0);

        let processed = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Audio(format!("resampling failed: {e}")))?;
        if let Some(channel) = processed.into_iter().next() {
            output.extend(channel);
        }

        offset = end;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_changes_length() {
        let input = vec![0.25f32; 22050];
        let output = resample(&input, 22050, 44100).unwrap();

        // Roughly doubled, plus padding from the final partial chunk
        assert!(output.len() >= 44100);
        assert!(output.len() < 44100 + 4 * RESAMPLE_CHUNK);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_mp3(&[0u8; 16]).is_err());
    }
}
