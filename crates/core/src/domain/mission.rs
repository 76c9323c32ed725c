use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::MissionMetadata;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub String);

impl MissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for MissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Running,
    WaitingClarification,
    Failed,
    Completed,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::WaitingClarification => "waiting_clarification",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "waiting_clarification" => Some(Self::WaitingClarification),
            "failed" => Some(Self::Failed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Terminal for one workflow run. A re-invocation may still move the mission back to `Running`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WaitingClarification | Self::Failed | Self::Completed)
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub user_id: UserId,
    pub prompt: String,
    pub status: MissionStatus,
    pub metadata: MissionMetadata,
    pub created_at: DateTime<Utc>,
}

impl Mission {
    pub fn new(user_id: UserId, prompt: impl Into<String>) -> Self {
        Self {
            id: MissionId::generate(),
            user_id,
            prompt: prompt.into(),
            status: MissionStatus::Pending,
            metadata: MissionMetadata::default(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mission, MissionStatus, UserId};

    #[test]
    fn new_missions_start_pending_with_empty_metadata() {
        let mission = Mission::new(UserId("U-1".to_string()), "Find SaaS founders in London");

        assert_eq!(mission.status, MissionStatus::Pending);
        assert!(mission.metadata.stage_keys().is_empty());
        assert!(!mission.id.0.is_empty());
    }

    #[test]
    fn status_round_trips_from_storage_encoding() {
        let cases = [
            MissionStatus::Pending,
            MissionStatus::Running,
            MissionStatus::WaitingClarification,
            MissionStatus::Failed,
            MissionStatus::Completed,
        ];

        for status in cases {
            assert_eq!(MissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MissionStatus::parse("archived"), None);
    }

    #[test]
    fn only_outcome_statuses_are_terminal() {
        assert!(!MissionStatus::Pending.is_terminal());
        assert!(!MissionStatus::Running.is_terminal());
        assert!(MissionStatus::WaitingClarification.is_terminal());
        assert!(MissionStatus::Failed.is_terminal());
        assert!(MissionStatus::Completed.is_terminal());
    }
}
