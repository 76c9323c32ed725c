//! Mission orchestrator: drives one mission through the ordered stage list.
//!
//! The driver loop runs every stage in order, tracks the results of the current run, and
//! consults the [`GatePolicy`] after each stage. Every error raised after the mission is loaded
//! lands in one failure boundary which records an `Orchestrator` error log and marks the mission
//! `failed`. Results merged by stages that completed before the failure stay on the mission.

use std::sync::Arc;

use thiserror::Error;

use herald_core::config::PipelineConfig;
use herald_core::domain::agent_log::{AgentName, NewAgentLog};
use herald_core::domain::mission::{Mission, MissionId, MissionStatus};
use herald_core::domain::stage::MissionMetadata;
use herald_db::{AgentLogRepository, MissionRepository, MissionStore, RepositoryError};

use crate::agents::{default_stages, AgentContext, AgentError, Stage};
use crate::gates::{GateDecision, GateHalt, GatePolicy};
use crate::llm::LlmClient;

#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowOutcome {
    /// No mission with the requested id exists; nothing was written.
    MissionNotFound,
    Completed,
    WaitingClarification { confidence_score: f64 },
    Rejected { feedback: String },
    Failed { message: String },
}

impl WorkflowOutcome {
    pub fn status(&self) -> Option<MissionStatus> {
        match self {
            Self::MissionNotFound => None,
            Self::Completed => Some(MissionStatus::Completed),
            Self::WaitingClarification { .. } => Some(MissionStatus::WaitingClarification),
            Self::Rejected { .. } | Self::Failed { .. } => Some(MissionStatus::Failed),
        }
    }
}

/// Raised only when the store cannot be read, or cannot take the record of a failure.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("mission store unavailable: {0}")]
    Store(#[from] RepositoryError),
}

pub struct MissionOrchestrator {
    store: Arc<dyn MissionStore>,
    stages: Vec<Box<dyn Stage>>,
    gates: GatePolicy,
    publishing_platforms: Vec<String>,
}

impl MissionOrchestrator {
    /// The standard five-stage pipeline.
    pub fn new(
        store: Arc<dyn MissionStore>,
        llm: Arc<dyn LlmClient>,
        pipeline: &PipelineConfig,
    ) -> Self {
        let context = AgentContext::new(store.clone(), llm);
        let stages = default_stages(&context, pipeline.min_intent_confidence);
        Self::with_stages(
            store,
            stages,
            GatePolicy::new(pipeline.min_intent_confidence),
            pipeline.publishing_platforms.clone(),
        )
    }

    pub fn with_stages(
        store: Arc<dyn MissionStore>,
        stages: Vec<Box<dyn Stage>>,
        gates: GatePolicy,
        publishing_platforms: Vec<String>,
    ) -> Self {
        Self { store, stages, gates, publishing_platforms }
    }

    pub fn store(&self) -> &Arc<dyn MissionStore> {
        &self.store
    }

    pub async fn run_workflow(
        &self,
        mission_id: &MissionId,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let Some(mission) = self.store.get_mission(mission_id).await? else {
            tracing::warn!(
                event_name = "mission.workflow.not_found",
                mission_id = %mission_id,
                "workflow requested for unknown mission"
            );
            return Ok(WorkflowOutcome::MissionNotFound);
        };

        tracing::info!(
            event_name = "mission.workflow.started",
            mission_id = %mission_id,
            stages = self.stages.len(),
            "mission workflow started"
        );

        match self.drive(&mission).await {
            Ok(outcome) => {
                tracing::info!(
                    event_name = "mission.workflow.finished",
                    mission_id = %mission_id,
                    status = outcome.status().map(|status| status.as_str()).unwrap_or("none"),
                    "mission workflow finished"
                );
                Ok(outcome)
            }
            Err(error) => self.fail(mission_id, error).await,
        }
    }

    async fn drive(&self, mission: &Mission) -> Result<WorkflowOutcome, AgentError> {
        self.store.update_mission_status(&mission.id, MissionStatus::Running).await?;
        self.store
            .create_agent_log(NewAgentLog::info(
                mission.id.clone(),
                AgentName::Orchestrator,
                "Mission loop started.",
            ))
            .await?;

        let mut produced = MissionMetadata::default();
        for stage in &self.stages {
            let output = stage.execute(mission, &produced).await?;
            tracing::info!(
                event_name = "mission.stage.completed",
                mission_id = %mission.id,
                stage = %stage.key(),
                agent = stage.agent().as_str(),
                "stage completed"
            );

            let decision = self.gates.evaluate(&output);
            produced.merge(output);

            if let GateDecision::Halt(halt) = decision {
                let status = halt.status();
                self.store.update_mission_status(&mission.id, status).await?;
                tracing::info!(
                    event_name = "mission.gate.halted",
                    mission_id = %mission.id,
                    stage = %stage.key(),
                    reason_code = halt.reason_code(),
                    status = status.as_str(),
                    "mission halted by gate"
                );
                return Ok(match halt {
                    GateHalt::NeedsClarification { confidence_score, .. } => {
                        WorkflowOutcome::WaitingClarification { confidence_score }
                    }
                    GateHalt::ComplianceRejected { feedback } => {
                        WorkflowOutcome::Rejected { feedback }
                    }
                });
            }
        }

        // Publishing is a placeholder step: nothing leaves the system.
        self.store
            .create_agent_log(NewAgentLog::info(
                mission.id.clone(),
                AgentName::Publishing,
                format!("Scheduling posts across {}...", self.publishing_targets(&produced)),
            ))
            .await?;
        self.store.update_mission_status(&mission.id, MissionStatus::Completed).await?;

        Ok(WorkflowOutcome::Completed)
    }

    async fn fail(
        &self,
        mission_id: &MissionId,
        error: AgentError,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let message = error.to_string();
        tracing::error!(
            event_name = "mission.workflow.failed",
            mission_id = %mission_id,
            error = %message,
            "mission workflow failed"
        );

        let logged = self
            .store
            .create_agent_log(NewAgentLog::error(
                mission_id.clone(),
                AgentName::Orchestrator,
                format!("Workflow error: {message}"),
            ))
            .await;
        let marked = self.store.update_mission_status(mission_id, MissionStatus::Failed).await;
        logged?;
        marked?;

        Ok(WorkflowOutcome::Failed { message })
    }

    fn publishing_targets(&self, produced: &MissionMetadata) -> String {
        let platforms = produced
            .intent
            .as_ref()
            .map(|intent| intent.platforms.as_slice())
            .filter(|platforms| !platforms.is_empty())
            .unwrap_or(self.publishing_platforms.as_slice());
        describe_platforms(platforms)
    }
}

fn describe_platforms(platforms: &[String]) -> String {
    match platforms {
        [] => "no platforms".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use herald_core::config::AppConfig;
    use herald_core::domain::agent_log::{AgentLog, AgentName, LogType, NewAgentLog};
    use herald_core::domain::mission::{Mission, MissionId, MissionStatus, UserId};
    use herald_core::domain::stage::{StageKey, StageOutput};
    use herald_db::{
        AgentLogRepository, InMemoryMissionStore, MissionRepository, RepositoryError,
    };

    use super::{describe_platforms, MissionOrchestrator, WorkflowError, WorkflowOutcome};
    use crate::agents::fixtures;
    use crate::llm::{CompletionError, ScriptedLlmClient};

    struct Harness {
        store: Arc<InMemoryMissionStore>,
        llm: Arc<ScriptedLlmClient>,
        orchestrator: MissionOrchestrator,
        mission: Mission,
    }

    async fn harness(prompt: &str, replies: Vec<Value>) -> Harness {
        harness_with(prompt, replies.into_iter().fold(ScriptedLlmClient::new(), |llm, reply| {
            llm.with_json(reply)
        }))
        .await
    }

    async fn harness_with(prompt: &str, llm: ScriptedLlmClient) -> Harness {
        let store = Arc::new(InMemoryMissionStore::new());
        let llm = Arc::new(llm);
        let mission = Mission::new(UserId("U-1".to_string()), prompt);
        store.create_mission(mission.clone()).await.expect("create mission");
        let orchestrator =
            MissionOrchestrator::new(store.clone(), llm.clone(), &AppConfig::default().pipeline);
        Harness { store, llm, orchestrator, mission }
    }

    fn full_pipeline(approved: bool) -> Vec<Value> {
        vec![
            fixtures::intent(0.92),
            fixtures::research(),
            fixtures::strategy(),
            fixtures::content(),
            fixtures::compliance(approved),
        ]
    }

    impl Harness {
        async fn mission(&self) -> Mission {
            self.store.get_mission(&self.mission.id).await.expect("get").expect("mission exists")
        }

        async fn logs(&self) -> Vec<AgentLog> {
            self.store.get_agent_logs(&self.mission.id).await.expect("logs")
        }
    }

    fn agents(logs: &[AgentLog]) -> Vec<AgentName> {
        logs.iter().map(|log| log.agent_name).collect()
    }

    #[tokio::test]
    async fn scenario_a_confident_intent_runs_all_stages_to_completion() {
        let harness = harness("Find SaaS founders in London", full_pipeline(true)).await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert_eq!(outcome, WorkflowOutcome::Completed);
        let mission = harness.mission().await;
        assert_eq!(mission.status, MissionStatus::Completed);
        assert_eq!(mission.metadata.stage_keys(), StageKey::ALL.to_vec());

        let logs = harness.logs().await;
        assert_eq!(
            agents(&logs),
            vec![
                AgentName::Orchestrator,
                AgentName::Intent,
                AgentName::Research,
                AgentName::Strategy,
                AgentName::Content,
                AgentName::Compliance,
                AgentName::Publishing,
            ]
        );
        assert_eq!(logs[0].message, "Mission loop started.");
        assert_eq!(logs[0].log_type, LogType::Info);
        assert_eq!(logs[6].message, "Scheduling posts across LinkedIn and X...");
        assert!(logs[1..6].iter().all(|log| log.log_type == LogType::Success));
        assert_eq!(harness.llm.requests().len(), 5);
    }

    #[tokio::test]
    async fn scenario_b_low_confidence_waits_for_clarification_after_intent_only() {
        let harness = harness("huh", vec![fixtures::intent(0.3)]).await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert_eq!(outcome, WorkflowOutcome::WaitingClarification { confidence_score: 0.3 });
        let mission = harness.mission().await;
        assert_eq!(mission.status, MissionStatus::WaitingClarification);
        assert_eq!(mission.metadata.stage_keys(), vec![StageKey::Intent]);

        let logs = harness.logs().await;
        assert_eq!(agents(&logs), vec![AgentName::Orchestrator, AgentName::Intent]);
        assert_eq!(logs[1].log_type, LogType::Warning);
        assert!(logs.iter().all(|log| log.log_type != LogType::Error));
        assert_eq!(harness.llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn scenario_c_compliance_rejection_fails_with_all_stage_results() {
        let harness = harness("Find SaaS founders in London", full_pipeline(false)).await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert_eq!(
            outcome,
            WorkflowOutcome::Rejected { feedback: "tone violates brand guidelines".to_string() }
        );
        let mission = harness.mission().await;
        assert_eq!(mission.status, MissionStatus::Failed);
        assert_eq!(mission.metadata.stage_keys(), StageKey::ALL.to_vec());

        let logs = harness.logs().await;
        let last = logs.last().expect("compliance log");
        assert_eq!(last.agent_name, AgentName::Compliance);
        assert_eq!(last.log_type, LogType::Warning);
        assert_eq!(last.data, Some(fixtures::compliance(false)));
        assert!(logs.iter().all(|log| log.agent_name != AgentName::Publishing));
        assert!(logs.iter().all(|log| log.log_type != LogType::Error));
    }

    #[tokio::test]
    async fn scenario_d_configuration_error_during_research_fails_with_intent_only() {
        let llm = ScriptedLlmClient::new().with_json(fixtures::intent(0.92)).with_error(
            CompletionError::Configuration("OpenAI API key is missing.".to_string()),
        );
        let harness = harness_with("Find SaaS founders in London", llm).await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert_eq!(
            outcome,
            WorkflowOutcome::Failed { message: "OpenAI API key is missing.".to_string() }
        );
        let mission = harness.mission().await;
        assert_eq!(mission.status, MissionStatus::Failed);
        assert_eq!(mission.metadata.stage_keys(), vec![StageKey::Intent]);

        let logs = harness.logs().await;
        assert_eq!(
            agents(&logs),
            vec![
                AgentName::Orchestrator,
                AgentName::Intent,
                AgentName::Research,
                AgentName::Orchestrator,
            ]
        );
        assert_eq!(logs[2].log_type, LogType::Error);
        assert_eq!(logs[2].message, "Research failed: OpenAI API key is missing.");
        assert_eq!(logs[3].log_type, LogType::Error);
        assert_eq!(logs[3].message, "Workflow error: OpenAI API key is missing.");
    }

    #[tokio::test]
    async fn failure_mid_pipeline_keeps_results_of_completed_stages() {
        let llm = ScriptedLlmClient::new()
            .with_json(fixtures::intent(0.92))
            .with_json(fixtures::research())
            .with_json(fixtures::strategy())
            .with_reply(crate::llm::ScriptedReply::Content("{\"assets\": 42}".to_string()));
        let harness = harness_with("Find SaaS founders in London", llm).await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert!(matches!(outcome, WorkflowOutcome::Failed { .. }));
        let mission = harness.mission().await;
        assert_eq!(mission.status, MissionStatus::Failed);
        assert_eq!(
            mission.metadata.stage_keys(),
            vec![StageKey::Intent, StageKey::Research, StageKey::Strategy]
        );

        let logs = harness.logs().await;
        let failures: Vec<&AgentLog> =
            logs.iter().filter(|log| log.log_type == LogType::Error).collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].agent_name, AgentName::Content);
        assert!(failures[0].message.starts_with("Content generation failed: "));
        assert_eq!(failures[1].agent_name, AgentName::Orchestrator);
        assert!(failures[1].message.starts_with("Workflow error: "));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_at_the_first_stage() {
        let harness = harness_with(
            "Find SaaS founders in London",
            ScriptedLlmClient::unconfigured("OpenAI API key is missing."),
        )
        .await;

        let outcome =
            harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        assert!(matches!(outcome, WorkflowOutcome::Failed { .. }));
        let mission = harness.mission().await;
        assert!(mission.metadata.stage_keys().is_empty());
        assert!(harness.llm.requests().is_empty());

        let logs = harness.logs().await;
        assert_eq!(logs[1].message, "Failed to parse intent: OpenAI API key is missing.");
        assert_eq!(logs[2].message, "Workflow error: OpenAI API key is missing.");
    }

    #[tokio::test]
    async fn unknown_mission_is_a_silent_no_op() {
        let harness = harness("Find SaaS founders in London", full_pipeline(true)).await;
        let missing = MissionId("M-404".to_string());

        let outcome = harness.orchestrator.run_workflow(&missing).await.expect("workflow");

        assert_eq!(outcome, WorkflowOutcome::MissionNotFound);
        assert!(harness.store.get_agent_logs(&missing).await.expect("logs").is_empty());
        assert!(harness.llm.requests().is_empty());
    }

    #[tokio::test]
    async fn second_run_repeats_every_stage_and_duplicates_logs() {
        let mut replies = full_pipeline(true);
        replies.extend(full_pipeline(true));
        let harness = harness("Find SaaS founders in London", replies).await;

        for _ in 0..2 {
            let outcome =
                harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");
            assert_eq!(outcome, WorkflowOutcome::Completed);
        }

        let logs = harness.logs().await;
        assert_eq!(logs.len(), 14);
        assert_eq!(agents(&logs[..7]), agents(&logs[7..]));
        assert_eq!(harness.llm.requests().len(), 10);
    }

    #[tokio::test]
    async fn stage_requests_carry_upstream_results() {
        let harness = harness("Find SaaS founders in London", full_pipeline(true)).await;

        harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        let requests = harness.llm.requests();
        let intent_line = "Intent: Find SaaS founders in London";
        assert_eq!(requests[0].user, "Find SaaS founders in London");
        assert_eq!(requests[1].user, format!("{intent_line}\nPlatforms: LinkedIn, X"));

        let research = requests[2]
            .user
            .strip_prefix(&format!("{intent_line}\nResearch: "))
            .expect("research section");
        assert_eq!(
            serde_json::from_str::<Value>(research).expect("research payload"),
            fixtures::research()
        );
        assert!(requests[3].user.contains("\nStrategy: {"));
        assert!(requests[4].user.starts_with("Content: ["));
    }

    #[tokio::test]
    async fn publishing_falls_back_to_configured_platforms() {
        let mut intent = fixtures::intent(0.92);
        intent["platforms"] = json!([]);
        let mut replies = full_pipeline(true);
        replies[0] = intent;
        let harness = harness("Find SaaS founders in London", replies).await;

        harness.orchestrator.run_workflow(&harness.mission.id).await.expect("workflow");

        let logs = harness.logs().await;
        let publishing = logs.last().expect("publishing log");
        assert_eq!(publishing.agent_name, AgentName::Publishing);
        assert_eq!(publishing.message, "Scheduling posts across Meta, X, and LinkedIn...");
    }

    #[test]
    fn platform_lists_read_naturally() {
        let names = |items: &[&str]| items.iter().map(|item| item.to_string()).collect::<Vec<_>>();
        assert_eq!(describe_platforms(&names(&["X"])), "X");
        assert_eq!(describe_platforms(&names(&["LinkedIn", "X"])), "LinkedIn and X");
        assert_eq!(describe_platforms(&names(&["Meta", "X", "LinkedIn"])), "Meta, X, and LinkedIn");
    }

    #[tokio::test]
    async fn sql_store_run_persists_results_and_logs() {
        let pool = herald_db::connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect");
        herald_db::migrations::run_pending(&pool).await.expect("migrations");
        let store = Arc::new(herald_db::SqlMissionStore::new(pool));
        let llm = full_pipeline(true)
            .into_iter()
            .fold(ScriptedLlmClient::new(), |llm, reply| llm.with_json(reply));
        let mission = Mission::new(UserId("U-1".to_string()), "Find SaaS founders in London");
        store.create_mission(mission.clone()).await.expect("create mission");
        let orchestrator = MissionOrchestrator::new(
            store.clone(),
            Arc::new(llm),
            &AppConfig::default().pipeline,
        );

        let outcome = orchestrator.run_workflow(&mission.id).await.expect("workflow");

        assert_eq!(outcome, WorkflowOutcome::Completed);
        let stored = store.get_mission(&mission.id).await.expect("get").expect("mission");
        assert_eq!(stored.status, MissionStatus::Completed);
        assert_eq!(stored.metadata.stage_keys(), StageKey::ALL.to_vec());
        let logs = store.get_agent_logs(&mission.id).await.expect("logs");
        assert_eq!(logs.len(), 7);
        assert_eq!(logs[6].agent_name, AgentName::Publishing);
    }

    struct OfflineStore;

    fn offline() -> RepositoryError {
        RepositoryError::Decode("store offline".to_string())
    }

    #[async_trait]
    impl MissionRepository for OfflineStore {
        async fn create_mission(&self, _mission: Mission) -> Result<(), RepositoryError> {
            Err(offline())
        }

        async fn get_mission(&self, _id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
            Err(offline())
        }

        async fn list_missions_for_user(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<Mission>, RepositoryError> {
            Err(offline())
        }

        async fn update_mission_status(
            &self,
            _id: &MissionId,
            _status: MissionStatus,
        ) -> Result<(), RepositoryError> {
            Err(offline())
        }

        async fn update_mission_metadata(
            &self,
            _id: &MissionId,
            _output: &StageOutput,
        ) -> Result<(), RepositoryError> {
            Err(offline())
        }
    }

    #[async_trait]
    impl AgentLogRepository for OfflineStore {
        async fn create_agent_log(
            &self,
            _entry: NewAgentLog,
        ) -> Result<AgentLog, RepositoryError> {
            Err(offline())
        }

        async fn get_agent_logs(
            &self,
            _mission_id: &MissionId,
        ) -> Result<Vec<AgentLog>, RepositoryError> {
            Err(offline())
        }
    }

    #[tokio::test]
    async fn unreadable_store_is_a_workflow_error() {
        let orchestrator = MissionOrchestrator::new(
            Arc::new(OfflineStore),
            Arc::new(ScriptedLlmClient::new()),
            &AppConfig::default().pipeline,
        );

        let result = orchestrator.run_workflow(&MissionId("M-1".to_string())).await;

        assert!(matches!(result, Err(WorkflowError::Store(RepositoryError::Decode(_)))));
    }
}
