use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use herald_core::config::{LlmConfig, LlmProvider};

use crate::llm::{CompletionError, CompletionRequest, CompletionResponse, LlmClient};

pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API key is missing. Set HERALD_LLM_API_KEY or OPENAI_API_KEY.";

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenAI itself, Ollama).
pub struct OpenAiClient {
    http: Client,
    provider: LlmProvider,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CompletionError::Transport(format!("could not build http client: {e}")))?;

        Ok(Self {
            http,
            provider: config.provider,
            api_key: config.usable_api_key().map(|key| SecretString::from(key.to_string())),
            base_url: config.effective_base_url(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn usable_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormatBody,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn request_body<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [
            ChatMessage { role: "system", content: &request.system },
            ChatMessage { role: "user", content: &request.user },
        ],
        response_format: ResponseFormatBody { kind: "json_object" },
    }
}

fn parse_response(body: &str) -> Result<CompletionResponse, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Transport(format!("unreadable completion payload: {e}")))?;
    let content = parsed.choices.into_iter().next().and_then(|choice| choice.message.content);
    Ok(CompletionResponse { content })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn ensure_configured(&self) -> Result<(), CompletionError> {
        match (self.provider, self.usable_key()) {
            (LlmProvider::Ollama, _) | (LlmProvider::OpenAi, Some(_)) => Ok(()),
            (LlmProvider::OpenAi, None) => {
                Err(CompletionError::Configuration(MISSING_API_KEY_MESSAGE.to_string()))
            }
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let mut builder = self.http.post(self.endpoint()).json(&request_body(&self.model, request));
        if let Some(key) = self.usable_key() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Transport(format!("request timed out: {e}"))
            } else if e.is_connect() {
                CompletionError::Transport(format!("connection failed: {e}"))
            } else {
                CompletionError::Transport(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(format!("could not read response body: {e}")))?;

        if !status.is_success() {
            tracing::warn!(
                event_name = "llm.request.rejected",
                status = status.as_u16(),
                model = %self.model,
                "completion request rejected"
            );
            return Err(CompletionError::Http { status: status.as_u16(), body });
        }

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use herald_core::config::{AppConfig, LlmProvider};

    use super::{parse_response, request_body, OpenAiClient, MISSING_API_KEY_MESSAGE};
    use crate::llm::{CompletionError, CompletionRequest, LlmClient};

    fn client(provider: LlmProvider, api_key: Option<&str>) -> OpenAiClient {
        let mut config = AppConfig::default().llm;
        config.provider = provider;
        config.api_key = api_key.map(|key| SecretString::from(key.to_string()));
        OpenAiClient::from_config(&config).expect("build client")
    }

    #[test]
    fn missing_or_placeholder_key_is_a_configuration_error() {
        for key in [None, Some(""), Some("placeholder")] {
            let error = client(LlmProvider::OpenAi, key)
                .ensure_configured()
                .expect_err("credential check should fail");
            assert!(matches!(error, CompletionError::Configuration(ref message)
                if message == MISSING_API_KEY_MESSAGE));
        }
    }

    #[test]
    fn readiness_check_agrees_with_credential_check() {
        let keys = [None, Some(""), Some("  "), Some("placeholder"), Some(" placeholder ")];
        for key in keys.into_iter().chain([Some("sk-test")]) {
            let mut config = AppConfig::default().llm;
            config.provider = LlmProvider::OpenAi;
            config.api_key = key.map(|key| SecretString::from(key.to_string()));
            let client = OpenAiClient::from_config(&config).expect("build client");
            assert_eq!(
                config.has_api_key(),
                client.ensure_configured().is_ok(),
                "key {key:?} judged differently"
            );
        }
    }

    #[test]
    fn configured_key_and_ollama_pass_credential_check() {
        assert!(client(LlmProvider::OpenAi, Some("sk-test")).ensure_configured().is_ok());
        assert!(client(LlmProvider::Ollama, None).ensure_configured().is_ok());
    }

    #[test]
    fn request_body_asks_for_a_json_object() {
        let request = CompletionRequest::json("You are the research agent.", "Intent: launch");
        let body = serde_json::to_value(request_body("gpt-4o", &request)).expect("serialize body");

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You are the research agent."},
                    {"role": "user", "content": "Intent: launch"}
                ],
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn response_content_is_taken_from_first_choice() {
        let parsed = parse_response(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"approved\":true}"}}]}"#,
        )
        .expect("parse response");
        assert_eq!(parsed.content.as_deref(), Some(r#"{"approved":true}"#));
    }

    #[test]
    fn missing_choices_or_content_yield_no_content() {
        assert_eq!(parse_response(r#"{"choices":[]}"#).expect("parse").content, None);
        assert_eq!(
            parse_response(r#"{"choices":[{"message":{"content":null}}]}"#).expect("parse").content,
            None
        );
    }

    #[test]
    fn unreadable_payload_is_a_transport_error() {
        assert!(matches!(parse_response("<html>"), Err(CompletionError::Transport(_))));
    }
}
