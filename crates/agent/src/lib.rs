//! Mission pipeline: the LLM client seam, the five agents, the gates between them and the
//! orchestrator that runs a mission end to end.
//!
//! The model only ever produces stage results. Which stage runs next, and whether the mission
//! waits, fails or completes, is decided by [`gates::GatePolicy`] in code.

pub mod agents;
pub mod gates;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod runtime;
pub mod structured;

pub use agents::{AgentContext, AgentError, Stage};
pub use gates::{GateDecision, GateHalt, GatePolicy};
pub use llm::{CompletionError, LlmClient, ScriptedLlmClient, ScriptedReply};
pub use openai::OpenAiClient;
pub use orchestrator::{MissionOrchestrator, WorkflowError, WorkflowOutcome};
pub use runtime::{MissionHandle, MissionRuntime, RuntimeError};
pub use structured::StructuredCompletionClient;
