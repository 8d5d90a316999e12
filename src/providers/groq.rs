// file: src/providers/groq.rs
// description: Groq chat completion client used for summarization and classification
// reference: https://console.groq.com/docs/api-reference#chat

use super::LlmClient;
use crate::config::LlmConfig;
use crate::error::{CollaboratorError, PipelineError, Result};
use crate::utils::Validator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Config(
                    "llm.api_key is not set (or export GROQ_API_KEY)".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CollaboratorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "Requesting completion from {} for {} chars",
            self.model,
            prompt.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::llm(format!("Groq request timed out: {}", e))
                } else {
                    CollaboratorError::llm(format!("Failed to send Groq API request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CollaboratorError::llm(format!(
                "Groq API request failed with status {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            CollaboratorError::llm(format!("Failed to parse Groq API response: {}", e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CollaboratorError::llm("No completion returned from Groq API"))?;

        Validator::validate_content_not_empty(&content)
            .map_err(|_| CollaboratorError::llm("Groq API returned an empty completion"))?;

        debug!("Received completion of {} chars", content.len());
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Service;

    fn config_for(server_url: &str) -> LlmConfig {
        let mut config = Config::default_config().llm;
        config.endpoint = format!("{}/openai/v1/chat/completions", server_url);
        config.api_key = Some("test-key".to_string());
        config.timeout_secs = 5;
        config
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut config = Config::default_config().llm;
        config.api_key = Some("   ".to_string());
        assert!(matches!(
            GroqClient::new(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [{ "role": "user", "content": "Summarize this" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  Tech \n"}}]}"#)
            .create_async()
            .await;

        let client = GroqClient::new(&config_for(&server.url())).unwrap();
        let reply = client.complete("Summarize this").await.unwrap();

        assert_eq!(reply, "Tech");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_becomes_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let client = GroqClient::new(&config_for(&server.url())).unwrap();
        let err = client.complete("anything").await.unwrap_err();

        assert_eq!(err.service, Service::Llm);
        assert!(err.message.contains("429"));
        assert!(err.message.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = GroqClient::new(&config_for(&server.url())).unwrap();
        let err = client.complete("anything").await.unwrap_err();
        assert!(err.message.contains("No completion"));
    }
}
