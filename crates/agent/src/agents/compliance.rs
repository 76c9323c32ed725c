use async_trait::async_trait;

use herald_core::domain::agent_log::{AgentName, LogType};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{
    ComplianceResult, ContentResult, MissionMetadata, StageKey, StageOutput,
};

use super::{encode, record_failure, record_success, AgentContext, AgentError, Stage};

const SYSTEM_INSTRUCTIONS: &str = r#"You are the Brand, Safety & Compliance Agent.
Review the generated content for brand voice consistency, safety issues and platform policy
violations. Approve it only when it can be published as is.

Answer with a JSON object of exactly this shape:
{
  "approved": boolean,
  "feedback": string,
  "risks": string[]
}"#;

pub struct ComplianceAgent {
    context: AgentContext,
}

impl ComplianceAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        mission_id: &MissionId,
        content: &ContentResult,
    ) -> Result<ComplianceResult, AgentError> {
        match self.review(mission_id, content).await {
            Ok(result) => Ok(result),
            Err(error) => Err(record_failure(
                &self.context,
                mission_id,
                AgentName::Compliance,
                "Compliance review failed",
                error,
            )
            .await),
        }
    }

    async fn review(
        &self,
        mission_id: &MissionId,
        content: &ContentResult,
    ) -> Result<ComplianceResult, AgentError> {
        let prompt = format!("Content: {}", encode(content)?);
        let result: ComplianceResult =
            self.context.completions.get_structured_result(&prompt, SYSTEM_INSTRUCTIONS).await?;

        let (log_type, message) = if result.approved {
            (LogType::Success, "Compliance check passed.")
        } else {
            (LogType::Warning, "Compliance check failed. Revision required.")
        };

        record_success(
            &self.context,
            mission_id,
            AgentName::Compliance,
            StageOutput::Compliance(result.clone()),
            log_type,
            message.to_string(),
        )
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl Stage for ComplianceAgent {
    fn key(&self) -> StageKey {
        StageKey::Compliance
    }

    fn agent(&self) -> AgentName {
        AgentName::Compliance
    }

    async fn execute(
        &self,
        mission: &Mission,
        produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError> {
        let content = produced.require_content(StageKey::Compliance)?;
        self.run(&mission.id, content).await.map(StageOutput::Compliance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_core::domain::agent_log::LogType;
    use herald_core::domain::mission::{Mission, UserId};
    use herald_core::domain::stage::ContentResult;
    use herald_db::{AgentLogRepository, InMemoryMissionStore, MissionRepository};

    use super::ComplianceAgent;
    use crate::agents::{fixtures, AgentContext};
    use crate::llm::ScriptedLlmClient;

    #[tokio::test]
    async fn rejection_is_logged_as_warning_with_payload() {
        let store = Arc::new(InMemoryMissionStore::new());
        let mission = Mission::new(UserId("U-1".to_string()), "launch");
        store.create_mission(mission.clone()).await.expect("create");
        let llm = Arc::new(ScriptedLlmClient::new().with_json(fixtures::compliance(false)));
        let agent = ComplianceAgent::new(AgentContext::new(store.clone(), llm.clone()));
        let content: ContentResult = serde_json::from_value(fixtures::content()).expect("content");

        let result = agent.run(&mission.id, &content).await.expect("compliance");

        assert!(!result.approved);
        assert!(llm.requests()[0].user.starts_with("Content: [{"));

        let logs = store.get_agent_logs(&mission.id).await.expect("logs");
        assert_eq!(logs[0].log_type, LogType::Warning);
        assert_eq!(logs[0].message, "Compliance check failed. Revision required.");
        assert_eq!(logs[0].data, Some(fixtures::compliance(false)));
    }
}
