use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use herald_core::domain::agent_log::{AgentLog, AgentLogId, NewAgentLog};
use herald_core::domain::mission::{Mission, MissionId, MissionStatus, UserId};
use herald_core::domain::stage::StageOutput;

use super::{AgentLogRepository, MissionRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryMissionStore {
    missions: RwLock<HashMap<String, Mission>>,
    logs: RwLock<Vec<AgentLog>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MissionRepository for InMemoryMissionStore {
    async fn create_mission(&self, mission: Mission) -> Result<(), RepositoryError> {
        let mut missions = self.missions.write().await;
        if missions.contains_key(&mission.id.0) {
            return Err(RepositoryError::AlreadyExists(mission.id.0.clone()));
        }
        missions.insert(mission.id.0.clone(), mission);
        Ok(())
    }

    async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
        let missions = self.missions.read().await;
        Ok(missions.get(&id.0).cloned())
    }

    async fn list_missions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Mission>, RepositoryError> {
        let missions = self.missions.read().await;
        let mut owned: Vec<Mission> =
            missions.values().filter(|mission| &mission.user_id == user_id).cloned().collect();
        owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(owned)
    }

    async fn update_mission_status(
        &self,
        id: &MissionId,
        status: MissionStatus,
    ) -> Result<(), RepositoryError> {
        let mut missions = self.missions.write().await;
        let mission =
            missions.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;
        mission.status = status;
        Ok(())
    }

    async fn update_mission_metadata(
        &self,
        id: &MissionId,
        output: &StageOutput,
    ) -> Result<(), RepositoryError> {
        let mut missions = self.missions.write().await;
        let mission =
            missions.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;
        mission.metadata.merge(output.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl AgentLogRepository for InMemoryMissionStore {
    async fn create_agent_log(&self, entry: NewAgentLog) -> Result<AgentLog, RepositoryError> {
        let log = AgentLog::from_new(AgentLogId::generate(), entry, Utc::now());
        let mut logs = self.logs.write().await;
        logs.push(log.clone());
        Ok(log)
    }

    async fn get_agent_logs(
        &self,
        mission_id: &MissionId,
    ) -> Result<Vec<AgentLog>, RepositoryError> {
        let logs = self.logs.read().await;
        Ok(logs.iter().filter(|log| &log.mission_id == mission_id).cloned().collect())
    }
}
