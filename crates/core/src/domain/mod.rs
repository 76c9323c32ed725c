pub mod agent_log;
pub mod mission;
pub mod stage;
