// cnshield-core/src/verifier/api.rs
//! Networked verifier against an OpenAI-compatible chat completion endpoint.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ApiVerifierConfig;
use crate::errors::ShieldError;
use crate::verifier::prompt::{parse_verdict, render_prompt, SYSTEM_PROMPT};
use crate::verifier::{Verdict, VerificationRequest, Verifier};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ApiVerifier {
    client: Client,
    endpoint: String,
    config: ApiVerifierConfig,
}

impl ApiVerifier {
    /// `timeout_ms` bounds each HTTP call; the gate applies its own timeout on top.
    pub fn new(config: &ApiVerifierConfig, timeout_ms: u64) -> Result<Self, ShieldError> {
        if config.base_url.trim().is_empty() || config.model.trim().is_empty() {
            return Err(ShieldError::InvalidConfig(
                "api verifier needs both base_url and model".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("cnshield/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShieldError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim().trim_end_matches('/')),
            config: config.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl Verifier for ApiVerifier {
    fn name(&self) -> &str {
        "api"
    }

    async fn verify(&self, request: &VerificationRequest) -> Result<Verdict> {
        let prompt = render_prompt(request)?;

        let mut call = self.client.post(&self.endpoint).json(&self.request_body(&prompt));
        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }
        let resp = call
            .send()
            .await
            .with_context(|| format!("Verifier request to {} failed", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Verifier endpoint returned HTTP {}", status));
        }

        let body: ChatCompletionResponse = resp
            .json()
            .await
            .context("Verifier endpoint returned an unexpected body")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Verifier response has no message content"))?;

        debug!(target: "cnshield_core::verifier", "API verifier replied with {} chars.", content.chars().count());
        parse_verdict(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiVerifierConfig {
        ApiVerifierConfig {
            base_url: "https://llm.internal.example/v1/".into(),
            model: "qwen2.5-7b-instruct".into(),
            api_key: Some("sk-test".into()),
            ..ApiVerifierConfig::default()
        }
    }

    #[test]
    fn test_endpoint_and_body() {
        let verifier = ApiVerifier::new(&config(), 1_000).unwrap();
        assert_eq!(verifier.endpoint(), "https://llm.internal.example/v1/chat/completions");

        let body = serde_json::to_value(verifier.request_body("prompt")).unwrap();
        assert_eq!(body["model"], "qwen2.5-7b-instruct");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "prompt");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_missing_endpoint_is_a_config_error() {
        let err = ApiVerifier::new(&ApiVerifierConfig::default(), 1_000).err().unwrap();
        assert!(matches!(err, ShieldError::InvalidConfig(_)));
    }

    #[test]
    fn test_response_shape() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"is_sensitive\":true}"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert!(parse_verdict(content).unwrap().confirmed);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = ApiVerifierConfig { base_url: "http://127.0.0.1:9".into(), ..config() };
        let verifier = ApiVerifier::new(&config, 500).unwrap();
        let request = VerificationRequest {
            entity_type: crate::entity::EntityType::Phone,
            text: "13812345678".into(),
            context: "【13812345678】".into(),
            score: 0.5,
        };
        assert!(verifier.verify(&request).await.is_err());
    }
}
