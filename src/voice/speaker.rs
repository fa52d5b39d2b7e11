//! Spoken output: synthesis followed by blocking playback

use async_trait::async_trait;

use super::{AudioPlayback, TextToSpeech};
use crate::Result;
use crate::services::Synthesizer;

/// Speaks text through the TTS provider and the default speakers
pub struct VoiceOutput {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl VoiceOutput {
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait(?Send)]
impl Synthesizer for VoiceOutput {
    async fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        tracing::debug!(text, "speaking");
        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio).await
    }
}
