use async_trait::async_trait;

use herald_core::domain::agent_log::{AgentName, LogType};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{IntentResult, MissionMetadata, StageKey, StageOutput};

use super::{record_failure, record_success, AgentContext, AgentError, Stage};

const SYSTEM_INSTRUCTIONS: &str = r#"You are the Intent Parsing & Control Agent.
You work for an autonomous marketing platform. From the user's request, extract the underlying
intent, the target platforms, the objectives and the posting frequency. Note any compliance
constraints the request implies and rate how confident you are in this reading with a score
between 0 and 1.

Answer with a JSON object of exactly this shape:
{
  "intent": string,
  "platforms": string[],
  "objectives": string[],
  "posting_frequency": string,
  "compliance_constraints": object,
  "confidence_score": number
}"#;

pub struct IntentAgent {
    context: AgentContext,
    confident_above: f64,
}

impl IntentAgent {
    /// `confident_above` is the score a result must exceed to be logged as `success`.
    pub fn new(context: AgentContext, confident_above: f64) -> Self {
        Self { context, confident_above }
    }

    pub async fn run(
        &self,
        mission_id: &MissionId,
        prompt: &str,
    ) -> Result<IntentResult, AgentError> {
        match self.extract(mission_id, prompt).await {
            Ok(result) => Ok(result),
            Err(error) => Err(record_failure(
                &self.context,
                mission_id,
                AgentName::Intent,
                "Failed to parse intent",
                error,
            )
            .await),
        }
    }

    async fn extract(
        &self,
        mission_id: &MissionId,
        prompt: &str,
    ) -> Result<IntentResult, AgentError> {
        let result: IntentResult =
            self.context.completions.get_structured_result(prompt, SYSTEM_INSTRUCTIONS).await?;

        let log_type = if result.confidence_score > self.confident_above {
            LogType::Success
        } else {
            LogType::Warning
        };
        let message =
            format!("Extracted intent: {}. Confidence: {}", result.intent, result.confidence_score);

        record_success(
            &self.context,
            mission_id,
            AgentName::Intent,
            StageOutput::Intent(result.clone()),
            log_type,
            message,
        )
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl Stage for IntentAgent {
    fn key(&self) -> StageKey {
        StageKey::Intent
    }

    fn agent(&self) -> AgentName {
        AgentName::Intent
    }

    async fn execute(
        &self,
        mission: &Mission,
        _produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError> {
        self.run(&mission.id, &mission.prompt).await.map(StageOutput::Intent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_core::domain::agent_log::{AgentName, LogType};
    use herald_core::domain::mission::{Mission, UserId};
    use herald_core::domain::stage::StageKey;
    use herald_db::{AgentLogRepository, InMemoryMissionStore, MissionRepository};

    use super::IntentAgent;
    use crate::agents::{fixtures, AgentContext, AgentError};
    use crate::llm::{CompletionError, ScriptedLlmClient};

    async fn setup(
        llm: ScriptedLlmClient,
    ) -> (Arc<InMemoryMissionStore>, Arc<ScriptedLlmClient>, Mission) {
        let store = Arc::new(InMemoryMissionStore::new());
        let mission = Mission::new(UserId("U-1".to_string()), "Find SaaS founders in London");
        store.create_mission(mission.clone()).await.expect("create mission");
        (store, Arc::new(llm), mission)
    }

    #[tokio::test]
    async fn confident_intent_is_merged_and_logged_as_success() {
        let (store, llm, mission) =
            setup(ScriptedLlmClient::new().with_json(fixtures::intent(0.92))).await;
        let agent = IntentAgent::new(AgentContext::new(store.clone(), llm.clone()), 0.7);

        let result = agent.run(&mission.id, &mission.prompt).await.expect("intent result");

        assert_eq!(result.platforms, vec!["LinkedIn".to_string(), "X".to_string()]);
        assert_eq!(llm.requests()[0].user, "Find SaaS founders in London");

        let stored = store.get_mission(&mission.id).await.expect("get").expect("exists");
        assert_eq!(stored.metadata.stage_keys(), vec![StageKey::Intent]);

        let logs = store.get_agent_logs(&mission.id).await.expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].agent_name, AgentName::Intent);
        assert_eq!(logs[0].log_type, LogType::Success);
        assert_eq!(
            logs[0].message,
            "Extracted intent: Find SaaS founders in London. Confidence: 0.92"
        );
        assert_eq!(logs[0].data, Some(fixtures::intent(0.92)));
    }

    #[tokio::test]
    async fn confidence_at_the_threshold_is_logged_as_warning() {
        let (store, llm, mission) =
            setup(ScriptedLlmClient::new().with_json(fixtures::intent(0.7))).await;
        let agent = IntentAgent::new(AgentContext::new(store.clone(), llm), 0.7);

        agent.run(&mission.id, &mission.prompt).await.expect("intent result");

        let logs = store.get_agent_logs(&mission.id).await.expect("logs");
        assert_eq!(logs[0].log_type, LogType::Warning);
    }

    #[tokio::test]
    async fn completion_failure_is_logged_and_returned() {
        let (store, llm, mission) = setup(
            ScriptedLlmClient::new()
                .with_error(CompletionError::Transport("connection reset".to_string())),
        )
        .await;
        let agent = IntentAgent::new(AgentContext::new(store.clone(), llm), 0.7);

        let error = agent.run(&mission.id, &mission.prompt).await.expect_err("should fail");
        assert!(matches!(error, AgentError::Completion(CompletionError::Transport(_))));

        let stored = store.get_mission(&mission.id).await.expect("get").expect("exists");
        assert!(stored.metadata.stage_keys().is_empty());

        let logs = store.get_agent_logs(&mission.id).await.expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].log_type, LogType::Error);
        assert_eq!(
            logs[0].message,
            "Failed to parse intent: completion transport failed: connection reset"
        );
        assert_eq!(logs[0].data, None);
    }
}
