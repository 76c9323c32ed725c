use async_trait::async_trait;
use thiserror::Error;

use herald_core::domain::agent_log::{AgentLog, NewAgentLog};
use herald_core::domain::mission::{Mission, MissionId, MissionStatus, UserId};
use herald_core::domain::stage::StageOutput;

pub mod memory;
pub mod mission;

pub use memory::InMemoryMissionStore;
pub use mission::SqlMissionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("mission not found: {0}")]
    NotFound(String),
    #[error("mission already exists: {0}")]
    AlreadyExists(String),
}

#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn create_mission(&self, mission: Mission) -> Result<(), RepositoryError>;

    async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError>;

    /// Newest first.
    async fn list_missions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Mission>, RepositoryError>;

    async fn update_mission_status(
        &self,
        id: &MissionId,
        status: MissionStatus,
    ) -> Result<(), RepositoryError>;

    /// Sets the entry for `output`'s stage; entries of other stages are left as they are.
    async fn update_mission_metadata(
        &self,
        id: &MissionId,
        output: &StageOutput,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AgentLogRepository: Send + Sync {
    async fn create_agent_log(&self, entry: NewAgentLog) -> Result<AgentLog, RepositoryError>;

    /// Insertion order.
    async fn get_agent_logs(&self, mission_id: &MissionId)
        -> Result<Vec<AgentLog>, RepositoryError>;
}

/// The record store the orchestrator and agents run against.
pub trait MissionStore: MissionRepository + AgentLogRepository {}

impl<T> MissionStore for T where T: MissionRepository + AgentLogRepository {}
