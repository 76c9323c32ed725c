use async_trait::async_trait;

use herald_core::domain::agent_log::{AgentName, LogType};
use herald_core::domain::mission::{Mission, MissionId};
use herald_core::domain::stage::{
    IntentResult, MissionMetadata, ResearchResult, StageKey, StageOutput, StrategyResult,
};

use super::{encode, record_failure, record_success, AgentContext, AgentError, Stage};

const SYSTEM_INSTRUCTIONS: &str = r#"You are the Social Campaign Strategy Agent.
From the intent and the research report, define who to target (personas) and lay out a content
calendar. Recommend posting times per platform and the engagement KPIs to track.

Answer with a JSON object of exactly this shape:
{
  "personas": string[],
  "content_calendar": [{"date": string, "platform": string, "content_type": string}],
  "posting_times": object,
  "kpis": object
}"#;

pub struct StrategyAgent {
    context: AgentContext,
}

impl StrategyAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        mission_id: &MissionId,
        research: &ResearchResult,
        intent: &IntentResult,
    ) -> Result<StrategyResult, AgentError> {
        match self.plan(mission_id, research, intent).await {
            Ok(result) => Ok(result),
            Err(error) => Err(record_failure(
                &self.context,
                mission_id,
                AgentName::Strategy,
                "Strategy failed",
                error,
            )
            .await),
        }
    }

    async fn plan(
        &self,
        mission_id: &MissionId,
        research: &ResearchResult,
        intent: &IntentResult,
    ) -> Result<StrategyResult, AgentError> {
        let prompt = format!("Intent: {}\nResearch: {}", intent.intent, encode(research)?);
        let result: StrategyResult =
            self.context.completions.get_structured_result(&prompt, SYSTEM_INSTRUCTIONS).await?;

        record_success(
            &self.context,
            mission_id,
            AgentName::Strategy,
            StageOutput::Strategy(result.clone()),
            LogType::Success,
            "Campaign strategy formulated. Targeting and schedule defined.".to_string(),
        )
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl Stage for StrategyAgent {
    fn key(&self) -> StageKey {
        StageKey::Strategy
    }

    fn agent(&self) -> AgentName {
        AgentName::Strategy
    }

    async fn execute(
        &self,
        mission: &Mission,
        produced: &MissionMetadata,
    ) -> Result<StageOutput, AgentError> {
        let research = produced.require_research(StageKey::Strategy)?;
        let intent = produced.require_intent(StageKey::Strategy)?;
        self.run(&mission.id, research, intent).await.map(StageOutput::Strategy)
    }
}
