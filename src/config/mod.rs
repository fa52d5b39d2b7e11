//! Configuration management for Parley
//!
//! Every value resolves as env > TOML file > default.

pub mod file;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::conversation::voice_persona_prompt;
use crate::services::ListenParams;
use crate::{Error, Result};

use file::ParleyConfigFile;

/// Default assistant name (also the default wake phrase)
pub const DEFAULT_ASSISTANT_NAME: &str = "alice";

/// Default Groq OpenAI-compatible endpoint
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default `OpenAI` endpoint
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Parley configuration
#[derive(Debug)]
pub struct Config {
    /// Assistant identity
    pub assistant: AssistantConfig,

    /// Turn-taking phrases and failure reporting
    pub dialogue: DialogueConfig,

    /// Listening bounds
    pub listen: ListenConfig,

    /// Language model
    pub llm: LlmConfig,

    /// Speech-to-text
    pub stt: SttConfig,

    /// Text-to-speech
    pub tts: TtsConfig,
}

/// Assistant identity
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Name used in the persona prompt
    pub name: String,

    /// Phrase that wakes the assistant
    pub wake_phrase: String,

    /// System prompt seeding every conversation
    pub persona_prompt: String,
}

/// Turn-taking phrases and failure reporting
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Spoken when the wake phrase is heard
    pub acknowledgement: String,

    /// Spoken after the conversation is cleared
    pub restart_confirmation: String,

    /// Consecutive identical service errors before a warning is logged
    pub failure_warn_threshold: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            acknowledgement: "How you doing?".to_string(),
            restart_confirmation: "I just cleared the context window".to_string(),
            failure_warn_threshold: 3,
        }
    }
}

/// Listening bounds
#[derive(Debug, Clone, Copy)]
pub struct ListenConfig {
    /// How long to wait for speech to start
    pub timeout: Duration,

    /// Longest phrase captured
    pub phrase_time_limit: Duration,

    /// Background noise sampling before each wake listen
    pub ambient_window: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        let params = ListenParams::default();
        Self {
            timeout: params.timeout,
            phrase_time_limit: params.phrase_time_limit,
            ambient_window: Duration::from_secs(1),
        }
    }
}

impl ListenConfig {
    /// Bounds for a single listen
    #[must_use]
    pub const fn params(&self) -> ListenParams {
        ListenParams {
            timeout: self.timeout,
            phrase_time_limit: self.phrase_time_limit,
        }
    }
}

/// Language model configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Max tokens per response
    pub max_tokens: u32,

    pub api_key: Option<SecretString>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.6,
            max_tokens: 1024,
            api_key: None,
        }
    }
}

/// STT provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProvider {
    /// Whisper-compatible transcription endpoint (Groq, `OpenAI`)
    #[default]
    Whisper,
    Deepgram,
}

impl SttProvider {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::Whisper => GROQ_BASE_URL,
            Self::Deepgram => "https://api.deepgram.com/v1",
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-large-v3",
            Self::Deepgram => "nova-2",
        }
    }
}

impl fmt::Display for SttProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Whisper => "whisper",
            Self::Deepgram => "deepgram",
        })
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
}

impl Default for SttConfig {
    fn default() -> Self {
        let provider = SttProvider::default();
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
        }
    }
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum TtsProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
}

impl TtsProvider {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::ElevenLabs => "https://api.elevenlabs.io/v1",
        }
    }

    const fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAi => "alloy",
            Self::ElevenLabs => "cgSgspJ2msm6clMCkdW9",
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "tts-1",
            Self::ElevenLabs => "eleven_turbo_v2_5",
        }
    }
}

impl fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
        })
    }
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    pub base_url: String,

    /// Voice name (`OpenAI`) or voice ID (`ElevenLabs`)
    pub voice: String,

    pub model: String,

    /// Speech rate multiplier (`OpenAI` only)
    pub speed: f32,

    /// `ElevenLabs` voice settings
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,

    /// `ElevenLabs` latency optimization level (0-4)
    pub streaming_latency: u8,

    /// `ElevenLabs` output format
    pub output_format: String,

    pub api_key: Option<SecretString>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        let provider = TtsProvider::default();
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            voice: provider.default_voice().to_string(),
            model: provider.default_model().to_string(),
            speed: 1.0,
            stability: 0.3,
            similarity_boost: 0.2,
            style: 0.1,
            streaming_latency: 2,
            output_format: "mp3_22050_32".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the TOML file
    ///
    /// `config_path` overrides the standard file location.
    ///
    /// # Errors
    ///
    /// Returns error if an environment value is invalid or the wake phrase is blank
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if an environment value is invalid or the wake phrase is blank
    #[allow(clippy::needless_pass_by_value)]
    pub fn resolve(fc: ParleyConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        // API keys (env > toml > None)
        let groq_key = var("GROQ_API_KEY").or(fc.api_keys.groq);
        let openai_key = var("OPENAI_API_KEY").or(fc.api_keys.openai);
        let elevenlabs_key = var("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs);
        let deepgram_key = var("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram);
        let key_for_url = |url: &str| {
            if url.contains("groq.com") {
                groq_key.clone()
            } else {
                openai_key.clone()
            }
        };

        // Assistant (env > toml > default)
        let name = var("PARLEY_ASSISTANT_NAME")
            .or(fc.assistant.name)
            .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string());
        let wake_phrase = var("PARLEY_WAKE_PHRASE")
            .or(fc.assistant.wake_phrase)
            .unwrap_or_else(|| name.clone())
            .trim()
            .to_lowercase();
        if wake_phrase.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }
        let persona_prompt = fc
            .assistant
            .persona_prompt
            .unwrap_or_else(|| voice_persona_prompt(&name));
        let assistant = AssistantConfig {
            name,
            wake_phrase,
            persona_prompt,
        };

        let defaults = DialogueConfig::default();
        let dialogue = DialogueConfig {
            acknowledgement: fc.dialogue.acknowledgement.unwrap_or(defaults.acknowledgement),
            restart_confirmation: fc
                .dialogue
                .restart_confirmation
                .unwrap_or(defaults.restart_confirmation),
            failure_warn_threshold: fc
                .dialogue
                .failure_warn_threshold
                .unwrap_or(defaults.failure_warn_threshold)
                .max(1),
        };

        let defaults = ListenConfig::default();
        let listen = ListenConfig {
            timeout: fc
                .listen
                .timeout_ms
                .map_or(defaults.timeout, Duration::from_millis),
            phrase_time_limit: fc
                .listen
                .phrase_limit_ms
                .map_or(defaults.phrase_time_limit, Duration::from_millis),
            ambient_window: fc
                .listen
                .ambient_ms
                .map_or(defaults.ambient_window, Duration::from_millis),
        };

        // Language model (env > toml > default)
        let defaults = LlmConfig::default();
        let llm_base_url = var("PARLEY_LLM_BASE_URL")
            .or(fc.llm.base_url)
            .unwrap_or(defaults.base_url);
        let llm = LlmConfig {
            api_key: key_for_url(&llm_base_url).map(SecretString::from),
            base_url: llm_base_url,
            model: var("PARLEY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(defaults.model),
            temperature: fc.llm.temperature.unwrap_or(defaults.temperature),
            max_tokens: fc.llm.max_tokens.unwrap_or(defaults.max_tokens),
        };

        // Speech-to-text (env > toml > provider default)
        let stt_provider = match var("PARLEY_STT_PROVIDER") {
            Some(v) => v.parse()?,
            None => fc.stt.provider.unwrap_or_default(),
        };
        let stt_base_url = fc
            .stt
            .base_url
            .unwrap_or_else(|| stt_provider.default_base_url().to_string());
        let stt = SttConfig {
            provider: stt_provider,
            api_key: match stt_provider {
                SttProvider::Whisper => key_for_url(&stt_base_url),
                SttProvider::Deepgram => deepgram_key,
            }
            .map(SecretString::from),
            base_url: stt_base_url,
            model: var("PARLEY_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
        };

        // Text-to-speech (env > toml > provider default)
        let tts_provider = match var("PARLEY_TTS_PROVIDER") {
            Some(v) => v.parse()?,
            None => fc.tts.provider.unwrap_or_default(),
        };
        let defaults = TtsConfig::default();
        let tts = TtsConfig {
            provider: tts_provider,
            base_url: fc
                .tts
                .base_url
                .unwrap_or_else(|| tts_provider.default_base_url().to_string()),
            voice: var("PARLEY_TTS_VOICE")
                .or(fc.tts.voice)
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            model: var("PARLEY_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            speed: fc.tts.speed.unwrap_or(defaults.speed),
            stability: fc.tts.stability.unwrap_or(defaults.stability),
            similarity_boost: fc.tts.similarity_boost.unwrap_or(defaults.similarity_boost),
            style: fc.tts.style.unwrap_or(defaults.style),
            streaming_latency: fc
                .tts
                .streaming_latency
                .unwrap_or(defaults.streaming_latency),
            output_format: fc.tts.output_format.unwrap_or(defaults.output_format),
            api_key: match tts_provider {
                TtsProvider::OpenAi => openai_key,
                TtsProvider::ElevenLabs => elevenlabs_key,
            }
            .map(SecretString::from),
        };

        Ok(Self {
            assistant,
            dialogue,
            listen,
            llm,
            stt,
            tts,
        })
    }

    /// Override the wake phrase (e.g. from the command line)
    ///
    /// # Errors
    ///
    /// Returns error if the phrase is blank
    pub fn set_wake_phrase(&mut self, phrase: &str) -> Result<()> {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }
        self.assistant.wake_phrase = phrase;
        Ok(())
    }
}

/// Copy a secret into a new owned secret
pub(crate) fn share_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
