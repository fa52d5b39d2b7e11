//! Text-to-speech (TTS) processing

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::{TtsConfig, TtsProvider, share_secret};
use crate::{Error, Result};

/// ElevenLabs voice shaping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

#[derive(Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    provider: TtsProvider,
    base_url: String,
    voice: String,
    model: String,
    speed: f32,
    settings: VoiceSettings,
    streaming_latency: u8,
    output_format: String,
}

impl TextToSpeech {
    /// Create a TTS client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config.api_key.as_ref().map(share_secret).ok_or_else(|| {
            Error::Config(format!("API key required for {} TTS", config.provider))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            provider: config.provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice: config.voice.clone(),
            model: config.model.clone(),
            speed: config.speed,
            settings: VoiceSettings {
                stability: config.stability,
                similarity_boost: config.similarity_boost,
                style: config.style,
            },
            streaming_latency: config.streaming_latency,
            output_format: config.output_format.clone(),
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(provider = %self.provider, chars = text.len(), "synthesizing speech");
        let response = match self.provider {
            TtsProvider::OpenAi => self.request_openai(text).await?,
            TtsProvider::ElevenLabs => self.request_elevenlabs(text).await?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("{} TTS error {status}: {body}", self.provider)));
        }

        collect_body(response).await
    }

    async fn request_openai(&self, text: &str) -> Result<reqwest::Response> {
        let request = OpenAiSpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        self.client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("OpenAI TTS request failed: {e}")))
    }

    async fn request_elevenlabs(&self, text: &str) -> Result<reqwest::Response> {
        let url = format!("{}/text-to-speech/{}/stream", self.base_url, self.voice);
        let latency = self.streaming_latency.to_string();
        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: self.settings,
        };

        self.client
            .post(&url)
            .query(&[
                ("optimize_streaming_latency", latency.as_str()),
                ("output_format", self.output_format.as_str()),
            ])
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("ElevenLabs TTS request failed: {e}")))
    }
}

/// Gather a streamed audio body into memory
async fn collect_body(response: reqwest::Response) -> Result<Vec<u8>> {
    let mut stream = response.bytes_stream();
    let mut audio = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Tts(format!("audio stream interrupted: {e}")))?;
        audio.extend_from_slice(&chunk);
    }

    tracing::debug!(bytes = audio.len(), "speech audio received");
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevenlabs_request_body() {
        let request = ElevenLabsRequest {
            text: "How you doing?",
            model_id: "eleven_turbo_v2_5",
            voice_settings: VoiceSettings {
                stability: 0.3,
                similarity_boost: 0.2,
                style: 0.1,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "How you doing?");
        assert_eq!(json["model_id"], "eleven_turbo_v2_5");
        assert!(json["voice_settings"]["stability"].is_number());
        assert!(json["voice_settings"]["similarity_boost"].is_number());
        assert!(json["voice_settings"]["style"].is_number());
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = TtsConfig {
            api_key: None,
            ..TtsConfig::default()
        };
        assert!(matches!(TextToSpeech::new(&config), Err(Error::Config(_))));
    }
}
