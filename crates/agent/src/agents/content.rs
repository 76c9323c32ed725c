use async_trait::async_trait;

use herald_core::domain::agent_log::{AgentName, LogType};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{
    ContentResult, IntentResult, MissionMetadata, StageKey, StageOutput, StrategyResult,
};

use super::{encode, record_failure, record_success, AgentContext, AgentError, Stage};

const SYSTEM_INSTRUCTIONS: &str = r#"You are the Content Generation & Repurposing Agent.
Write platform-specific posts, captions and hooks that follow the campaign strategy, matching tone
and format to each persona and platform.

Answer with a JSON object holding the list of assets:
{
  "assets": [
    {
      "platform": string,
      "content_type": string,
      "text": string,
      "hashtags": string[],
      "cta": string
    }
  ]
}"#;

pub struct ContentAgent {
    context: AgentContext,
}

impl ContentAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        mission_id: &MissionId,
        strategy: &StrategyResult,
        intent: &IntentResult,
    ) -> Result<ContentResult, AgentError> {
        match self.generate(mission_id, strategy, intent).await {
            Ok(result) => Ok(result),
            Err(error) => Err(record_failure(
                &self.context,
                mission_id,
                AgentName::Content,
                "Content generation failed",
                error,
            )
            .await),
        }
    }

    async fn generate(
        &self,
        mission_id: &MissionId,
        strategy: &StrategyResult,
        intent: &IntentResult,
    ) -> Result<ContentResult, AgentError> {
        let prompt = format!("Intent: {}\nStrategy: {}", intent.intent, encode(strategy)?);
        let result: ContentResult =
            self.context.completions.get_structured_result(&prompt, SYSTEM_INSTRUCTIONS).await?;

        record_success(
            &self.context,
            mission_id,
            AgentName::Content,
            StageOutput::Content(result.clone()),
            LogType::Success,
            "Content generation complete. Platform-specific assets created.".to_string(),
        )
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl Stage for ContentAgent {
    fn key(&self) -> StageKey {
        StageKey::Content
    }

    fn agent(&self) -> AgentName {
        AgentName::Content
    }

    async fn execute(
        &self,
        mission: &Mission,
        produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError> {
        let strategy = produced.require_strategy(StageKey::Content)?;
        let intent = produced.require_intent(StageKey::Content)?;
        self.run(&mission.id, strategy, intent).await.map(StageOutput::Content)
    }
}
