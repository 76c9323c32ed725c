use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::mission::MissionId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentLogId(pub String);

impl AgentLogId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentName {
    #[serde(rename = "Orchestrator")]
    Orchestrator,
    #[serde(rename = "Intent Agent")]
    Intent,
    #[serde(rename = "Research Agent")]
    Research,
    #[serde(rename = "Strategy Agent")]
    Strategy,
    #[serde(rename = "Content Agent")]
    Content,
    #[serde(rename = "Compliance Agent")]
    Compliance,
    #[serde(rename = "Publishing Module")]
    Publishing,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orchestrator => "Orchestrator",
            Self::Intent => "Intent Agent",
            Self::Research => "Research Agent",
            Self::Strategy => "Strategy Agent",
            Self::Content => "Content Agent",
            Self::Compliance => "Compliance Agent",
            Self::Publishing => "Publishing Module",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Orchestrator" => Some(Self::Orchestrator),
            "Intent Agent" => Some(Self::Intent),
            "Research Agent" => Some(Self::Research),
            "Strategy Agent" => Some(Self::Strategy),
            "Content Agent" => Some(Self::Content),
            "Compliance Agent" => Some(Self::Compliance),
            "Publishing Module" => Some(Self::Publishing),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    Info,
    Success,
    Warning,
    Error,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A log entry as handed to the record store, before it is assigned an id and timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAgentLog {
    pub mission_id: MissionId,
    pub agent_name: AgentName,
    pub message: String,
    pub log_type: LogType,
    pub data: Option<Value>,
}

impl NewAgentLog {
    pub fn new(
        mission_id: MissionId,
        agent_name: AgentName,
        log_type: LogType,
        message: impl Into<String>,
    ) -> Self {
        Self { mission_id, agent_name, message: message.into(), log_type, data: None }
    }

    pub fn info(mission_id: MissionId, agent_name: AgentName, message: impl Into<String>) -> Self {
        Self::new(mission_id, agent_name, LogType::Info, message)
    }

    pub fn error(mission_id: MissionId, agent_name: AgentName, message: impl Into<String>) -> Self {
        Self::new(mission_id, agent_name, LogType::Error, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
    pub id: AgentLogId,
    pub mission_id: MissionId,
    pub agent_name: AgentName,
    pub message: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl AgentLog {
    pub fn from_new(id: AgentLogId, entry: NewAgentLog, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            mission_id: entry.mission_id,
            agent_name: entry.agent_name,
            message: entry.message,
            log_type: entry.log_type,
            data: entry.data,
            created_at,
        }
    }
}
