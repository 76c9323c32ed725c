//! The five pipeline agents.
//!
//! Every agent follows the same contract: compose a request from its instruction template and the
//! upstream results, ask for a structured completion, merge the result into the mission metadata
//! under its stage key, then append one log carrying the result as payload. A failure appends one
//! `error` log and is handed back to the caller unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use herald_core::domain::agent_log::{AgentName, LogType, NewAgentLog};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{MissionMetadata, StageKey, StageOutput};
use herald_core::errors::DomainError;
use herald_db::{AgentLogRepository, MissionRepository, MissionStore, RepositoryError};

use crate::llm::{CompletionError, LlmClient};
use crate::structured::StructuredCompletionClient;

pub mod compliance;
pub mod content;
pub mod intent;
pub mod research;
pub mod strategy;

pub use compliance::ComplianceAgent;
pub use content::ContentAgent;
pub use intent::IntentAgent;
pub use research::ResearchAgent;
pub use strategy::StrategyAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("could not encode stage input: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Collaborators shared by every agent of one pipeline.
#[derive(Clone)]
pub struct AgentContext {
    pub store: Arc<dyn MissionStore>,
    pub completions: StructuredCompletionClient,
}

impl AgentContext {
    pub fn new(store: Arc<dyn MissionStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, completions: StructuredCompletionClient::new(llm) }
    }
}

/// One step of the mission pipeline as seen by the orchestrator's driver loop.
#[async_trait]
pub trait Stage: Send + Sync {
    fn key(&self) -> StageKey;

    fn agent(&self) -> AgentName;

    /// Picks this stage's inputs out of the results produced so far in the run, then runs it.
    async fn execute(
        &self,
        mission: &Mission,
        produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError>;
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String, AgentError> {
    serde_json::to_string(value).map_err(AgentError::Encode)
}

/// Merges `output` into the mission and appends the stage's outcome log.
///
/// The two writes are sequential, not transactional. When the append fails after the merge, the
/// merged result stays on the mission and the stage still fails with the store error.
pub(crate) async fn record_success(
    context: &AgentContext,
    mission_id: &MissionId,
    agent: AgentName,
    output: StageOutput,
    log_type: LogType,
    message: String,
) -> Result<(), AgentError> {
    let payload = output.result_json().map_err(AgentError::Encode)?;
    context.store.update_mission_metadata(mission_id, &output).await?;
    context
        .store
        .create_agent_log(
            NewAgentLog::new(mission_id.clone(), agent, log_type, message).with_data(payload),
        )
        .await?;

    tracing::info!(
        event_name = "mission.stage.recorded",
        mission_id = %mission_id,
        stage = %output.key(),
        log_type = log_type.as_str(),
        "stage result recorded"
    );
    Ok(())
}

/// Appends the stage's `error` log and returns `error` for the caller to propagate.
pub(crate) async fn record_failure(
    context: &AgentContext,
    mission_id: &MissionId,
    agent: AgentName,
    prefix: &str,
    error: AgentError,
) -> AgentError {
    let entry = NewAgentLog::error(mission_id.clone(), agent, format!("{prefix}: {error}"));
    if let Err(log_error) = context.store.create_agent_log(entry).await {
        tracing::warn!(
            event_name = "mission.stage.log_failed",
            mission_id = %mission_id,
            agent = agent.as_str(),
            error = %log_error,
            "could not record stage failure"
        );
    }

    tracing::warn!(
        event_name = "mission.stage.failed",
        mission_id = %mission_id,
        agent = agent.as_str(),
        error = %error,
        "stage failed"
    );
    error
}

/// The five stages in pipeline order.
pub fn default_stages(context: &AgentContext, min_intent_confidence: f64) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(IntentAgent::new(context.clone(), min_intent_confidence)),
        Box::new(ResearchAgent::new(context.clone())),
        Box::new(StrategyAgent::new(context.clone())),
        Box::new(ContentAgent::new(context.clone())),
        Box::new(ComplianceAgent::new(context.clone())),
    ]
}
