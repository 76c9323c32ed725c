use async_trait::async_trait;

use herald_core::domain::agent_log::{AgentName, LogType};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{
    IntentResult, MissionMetadata, ResearchResult, StageKey, StageOutput,
};

use super::{record_failure, record_success, AgentContext, AgentError, Stage};

const SYSTEM_INSTRUCTIONS: &str = r#"You are the Market & Trend Research Agent.
Using the intent and platforms you are given, write a short trend and market research report:
which hashtags are trending, which formats go viral and which keywords competitors rank for.

Answer with a JSON object of exactly this shape:
{
  "trending_hashtags": string[],
  "viral_formats": string[],
  "competitor_keywords": string[],
  "date": string
}"#;

pub struct ResearchAgent {
    context: AgentContext,
}

impl ResearchAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        mission_id: &MissionId,
        intent: &IntentResult,
    ) -> Result<ResearchResult, AgentError> {
        match self.research(mission_id, intent).await {
            Ok(result) => Ok(result),
            Err(error) => Err(record_failure(
                &self.context,
                mission_id,
                AgentName::Research,
                "Research failed",
                error,
            )
            .await),
        }
    }

    async fn research(
        &self,
        mission_id: &MissionId,
        intent: &IntentResult,
    ) -> Result<ResearchResult, AgentError> {
        let prompt = request_for(intent);
        let result: ResearchResult =
            self.context.completions.get_structured_result(&prompt, SYSTEM_INSTRUCTIONS).await?;

        record_success(
            &self.context,
            mission_id,
            AgentName::Research,
            StageOutput::Research(result.clone()),
            LogType::Success,
            "Market research complete. Identified key trends and formats.".to_string(),
        )
        .await?;
        Ok(result)
    }
}

fn request_for(intent: &IntentResult) -> String {
    format!("Intent: {}\nPlatforms: {}", intent.intent, intent.platforms.join(", "))
}

#[async_trait]
impl Stage for ResearchAgent {
    fn key(&self) -> StageKey {
        StageKey::Research
    }

    fn agent(&self) -> AgentName {
        AgentName::Research
    }

    async fn execute(
        &self,
        mission: &Mission,
        produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError> {
        let intent = produced.require_intent(StageKey::Research)?;
        self.run(&mission.id, intent).await.map(StageOutput::Research)
    }
}
