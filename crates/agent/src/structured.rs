use std::sync::Arc;

use serde::de::DeserializeOwned;

use herald_core::domain::stage::ResponseContract;

use crate::llm::{CompletionError, CompletionRequest, LlmClient};

/// Turns one system/user instruction pair into one typed result: a single request, a single
/// parse, no retries.
#[derive(Clone)]
pub struct StructuredCompletionClient {
    llm: Arc<dyn LlmClient>,
}

impl StructuredCompletionClient {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn get_structured_result<T>(
        &self,
        user_prompt: &str,
        system_instructions: &str,
    ) -> Result<T, CompletionError>
    where
        T: DeserializeOwned + ResponseContract,
    {
        self.llm.ensure_configured()?;

        let request = CompletionRequest::json(system_instructions, user_prompt);
        let response = self.llm.complete(&request).await?;
        let content = response
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        let result: T = serde_json::from_str(&content)?;
        result.check().map_err(CompletionError::Contract)?;

        tracing::debug!(
            event_name = "llm.structured.parsed",
            response_bytes = content.len(),
            "structured completion parsed"
        );
        Ok(result)
    }
}
