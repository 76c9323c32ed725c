use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// One system/user instruction pair. Every request asks the model for a JSON object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    /// `None` when the provider returned no choice or a choice without text.
    pub content: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{0}")]
    Configuration(String),
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("No response from AI")]
    EmptyResponse,
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    #[error("completion violates the response contract: {0}")]
    Contract(String),
}

/// A language model that answers one system/user instruction pair.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Fails when the client cannot possibly reach the model, before any request is built.
    fn ensure_configured(&self) -> Result<(), CompletionError> {
        Ok(())
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

pub enum ScriptedReply {
    Content(String),
    Empty,
    Fail(CompletionError),
}

/// Deterministic client that replays queued replies in order and records every request.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    missing_credential: Option<String>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose credential check fails with `message`.
    pub fn unconfigured(message: impl Into<String>) -> Self {
        Self { missing_credential: Some(message.into()), ..Self::default() }
    }

    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push(reply);
        self
    }

    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_reply(ScriptedReply::Content(value.to_string()))
    }

    pub fn with_error(self, error: CompletionError) -> Self {
        self.with_reply(ScriptedReply::Fail(error))
    }

    pub fn push(&self, reply: ScriptedReply) {
        let mut replies = self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        replies.push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn ensure_configured(&self) -> Result<(), CompletionError> {
        match &self.missing_credential {
            Some(message) => Err(CompletionError::Configuration(message.clone())),
            None => Ok(()),
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let reply =
            self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).pop_front();
        match reply {
            Some(ScriptedReply::Content(content)) => {
                Ok(CompletionResponse { content: Some(content) })
            }
            Some(ScriptedReply::Empty) => Ok(CompletionResponse { content: None }),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => Err(CompletionError::Transport("no scripted reply left".to_string())),
        }
    }
}
