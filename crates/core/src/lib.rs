pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;

pub use domain::agent_log::{AgentLog, AgentLogId, AgentName, LogType, NewAgentLog};
pub use domain::mission::{Mission, MissionId, MissionStatus, UserId};
pub use domain::stage::{
    CalendarEntry, ComplianceResult, ContentAsset, ContentResult, IntentResult, MissionMetadata,
    ResearchResult, ResponseContract, StageKey, StageOutput, StrategyResult,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
