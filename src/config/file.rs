//! TOML configuration file loading
//!
//! Supports `~/.config/omni/parley/config.toml` as a persistent config source.
//! All fields are optional; the file overlays the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{SttProvider, TtsProvider};
use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParleyConfigFile {
    /// Assistant identity
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Turn-taking phrases and failure reporting
    #[serde(default)]
    pub dialogue: DialogueFileConfig,

    /// Listening bounds
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Assistant identity
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Assistant name used in the persona prompt (e.g. "alice")
    pub name: Option<String>,

    /// Wake phrase; defaults to the name
    pub wake_phrase: Option<String>,

    /// Full persona prompt, replacing the generated one
    pub persona_prompt: Option<String>,
}

/// Turn-taking phrases
#[derive(Debug, Default, Deserialize)]
pub struct DialogueFileConfig {
    /// Spoken when the wake phrase is heard
    pub acknowledgement: Option<String>,

    /// Spoken after the conversation is cleared
    pub restart_confirmation: Option<String>,

    /// Consecutive identical service errors before warning
    pub failure_warn_threshold: Option<u32>,
}

/// Listening bounds in milliseconds
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    pub timeout_ms: Option<u64>,
    pub phrase_limit_ms: Option<u64>,
    pub ambient_ms: Option<u64>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible API base URL
    pub base_url: Option<String>,

    /// Model identifier (e.g. "llama3-70b-8192")
    pub model: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    pub provider: Option<SttProvider>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub provider: Option<TtsProvider>,
    pub base_url: Option<String>,
    pub voice: Option<String>,
    pub model: Option<String>,
    pub speed: Option<f32>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub streaming_latency: Option<u8>,
    pub output_format: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file(path: Option<&Path>) -> ParleyConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return ParleyConfigFile::default();
    };

    if !path.exists() {
        return ParleyConfigFile::default();
    }

    match parse_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn parse_config_file(path: &Path) -> Result<ParleyConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/omni/parley/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("parley")
            .join("config.toml")
    })
}
