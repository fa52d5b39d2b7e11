//! Chat completion client for OpenAI-compatible endpoints (Groq, `OpenAI`)

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, share_secret};
use crate::conversation::Turn;
use crate::services::CompletionEngine;
use crate::{Error, Result};

/// Sends the conversation transcript to a chat completion API
pub struct ChatClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatClient {
    /// Create a chat client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured for the endpoint
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(share_secret)
            .ok_or_else(|| Error::Config(format!("API key required for {}", config.base_url)))?;

        tracing::info!(url = %config.base_url, model = %config.model, "chat client initialized");

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request<'a>(&'a self, turns: &'a [Turn]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: turns,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait(?Send)]
impl CompletionEngine for ChatClient {
    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        tracing::debug!(turns = turns.len(), model = %self.model, "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request(turns))
            .send()
            .await
            .map_err(|e| Error::Completion(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("API error {status}: {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("failed to parse response: {e}")))?;

        let reply = first_content(result)?;
        tracing::info!(response = %reply, "assistant responded");
        Ok(reply)
    }
}

fn first_content(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::Completion("response contained no content".to_string()))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        let config = LlmConfig {
            api_key: Some(SecretString::from("gsk-test".to_string())),
            ..LlmConfig::default()
        };
        ChatClient::new(&config).unwrap()
    }

    #[test]
    fn test_request_preserves_turns() {
        let client = client();
        let turns = vec![
            Turn::system("You are a voice assistant named alice."),
            Turn::user("tell me a joke"),
            Turn::assistant("Why did the chicken cross the road?"),
            Turn::user("why"),
        ];

        let json = serde_json::to_value(client.request(&turns)).unwrap();

        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["max_tokens"], 1024);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "tell me a joke");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "why");
    }

    #[test]
    fn test_first_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Sunny today."}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_content(parsed).unwrap(), "Sunny today.");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(empty), Err(Error::Completion(_))));

        let null: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(first_content(null).is_err());
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(matches!(
            ChatClient::new(&LlmConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
