use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Intent,
    Research,
    Strategy,
    Content,
    Compliance,
}

impl StageKey {
    /// Pipeline order.
    pub const ALL: [StageKey; 5] =
        [Self::Intent, Self::Research, Self::Strategy, Self::Content, Self::Compliance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Research => "research",
            Self::Strategy => "strategy",
            Self::Content => "content",
            Self::Compliance => "compliance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "intent" => Some(Self::Intent),
            "research" => Some(Self::Research),
            "strategy" => Some(Self::Strategy),
            "content" => Some(Self::Content),
            "compliance" => Some(Self::Compliance),
            _ => None,
        }
    }
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks a parsed completion against constraints the JSON shape alone cannot express.
pub trait ResponseContract {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: String,
    pub platforms: Vec<String>,
    pub objectives: Vec<String>,
    pub posting_frequency: String,
    pub compliance_constraints: Map<String, Value>,
    pub confidence_score: f64,
}

impl ResponseContract for IntentResult {
    fn check(&self) -> Result<(), String> {
        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score must be within 0..=1, got {}",
                self.confidence_score
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub trending_hashtags: Vec<String>,
    pub viral_formats: Vec<String>,
    pub competitor_keywords: Vec<String>,
    pub date: String,
}

impl ResponseContract for ResearchResult {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub date: String,
    pub platform: String,
    pub content_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub personas: Vec<String>,
    pub content_calendar: Vec<CalendarEntry>,
    pub posting_times: Map<String, Value>,
    pub kpis: Map<String, Value>,
}

impl ResponseContract for StrategyResult {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAsset {
    pub platform: String,
    pub content_type: String,
    pub text: String,
    pub hashtags: Vec<String>,
    pub cta: String,
}

/// Ordered platform assets. Serializes as a bare array; also accepts `{"assets": [...]}`
/// because JSON-object completion mode cannot produce a top-level array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentResult(pub Vec<ContentAsset>);

impl<'de> Deserialize<'de> for ContentResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bare(Vec<ContentAsset>),
            Wrapped { assets: Vec<ContentAsset> },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Bare(assets) | Wire::Wrapped { assets } => Self(assets),
        })
    }
}

impl ContentResult {
    pub fn assets(&self) -> &[ContentAsset] {
        &self.0
    }
}

impl ResponseContract for ContentResult {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub approved: bool,
    pub feedback: String,
    pub risks: Vec<String>,
}

impl ResponseContract for ComplianceResult {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "result", rename_all = "snake_case")]
pub enum StageOutput {
    Intent(IntentResult),
    Research(ResearchResult),
    Strategy(StrategyResult),
    Content(ContentResult),
    Compliance(ComplianceResult),
}

impl StageOutput {
    pub fn key(&self) -> StageKey {
        match self {
            Self::Intent(_) => StageKey::Intent,
            Self::Research(_) => StageKey::Research,
            Self::Strategy(_) => StageKey::Strategy,
            Self::Content(_) => StageKey::Content,
            Self::Compliance(_) => StageKey::Compliance,
        }
    }

    /// The bare result document, as persisted under the stage key and logged as payload.
    pub fn result_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Intent(result) => serde_json::to_value(result),
            Self::Research(result) => serde_json::to_value(result),
            Self::Strategy(result) => serde_json::to_value(result),
            Self::Content(result) => serde_json::to_value(result),
            Self::Compliance(result) => serde_json::to_value(result),
        }
    }

    pub fn from_result_json(key: StageKey, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match key {
            StageKey::Intent => Self::Intent(serde_json::from_value(value)?),
            StageKey::Research => Self::Research(serde_json::from_value(value)?),
            StageKey::Strategy => Self::Strategy(serde_json::from_value(value)?),
            StageKey::Content => Self::Content(serde_json::from_value(value)?),
            StageKey::Compliance => Self::Compliance(serde_json::from_value(value)?),
        })
    }
}

/// Typed per-stage results accumulated on a mission.
///
/// Serialized as an object keyed by stage name with absent stages omitted, so the stored
/// document is the usual `{ "intent": {...}, "research": {...} }` shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceResult>,
}

impl MissionMetadata {
    /// Replaces the entry for `output`'s stage and leaves every other stage untouched.
    pub fn merge(&mut self, output: StageOutput) {
        match output {
            StageOutput::Intent(result) => self.intent = Some(result),
            StageOutput::Research(result) => self.research = Some(result),
            StageOutput::Strategy(result) => self.strategy = Some(result),
            StageOutput::Content(result) => self.content = Some(result),
            StageOutput::Compliance(result) => self.compliance = Some(result),
        }
    }

    pub fn contains(&self, key: StageKey) -> bool {
        match key {
            StageKey::Intent => self.intent.is_some(),
            StageKey::Research => self.research.is_some(),
            StageKey::Strategy => self.strategy.is_some(),
            StageKey::Content => self.content.is_some(),
            StageKey::Compliance => self.compliance.is_some(),
        }
    }

    pub fn stage_keys(&self) -> Vec<StageKey> {
        StageKey::ALL.into_iter().filter(|key| self.contains(*key)).collect()
    }

    pub fn require_intent(&self, stage: StageKey) -> Result<&IntentResult, DomainError> {
        self.intent.as_ref().ok_or(DomainError::MissingStageInput {
            stage,
            requires: StageKey::Intent,
        })
    }

    pub fn require_research(&self, stage: StageKey) -> Result<&ResearchResult, DomainError> {
        self.research.as_ref().ok_or(DomainError::MissingStageInput {
            stage,
            requires: StageKey::Research,
        })
    }

    pub fn require_strategy(&self, stage: StageKey) -> Result<&StrategyResult, DomainError> {
        self.strategy.as_ref().ok_or(DomainError::MissingStageInput {
            stage,
            requires: StageKey::Strategy,
        })
    }

    pub fn require_content(&self, stage: StageKey) -> Result<&ContentResult, DomainError> {
        self.content.as_ref().ok_or(DomainError::MissingStageInput {
            stage,
            requires: StageKey::Content,
        })
    }
}
