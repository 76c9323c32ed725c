use herald_core::domain::mission::MissionStatus;
use herald_core::domain::stage::StageOutput;

#[derive(Clone, Debug, PartialEq)]
pub enum GateHalt {
    /// The intent reading is too uncertain to act on; the user needs to clarify.
    NeedsClarification { confidence_score: f64, threshold: f64 },
    /// Compliance review did not approve the generated content.
    ComplianceRejected { feedback: String },
}

impl GateHalt {
    pub fn status(&self) -> MissionStatus {
        match self {
            Self::NeedsClarification { .. } => MissionStatus::WaitingClarification,
            Self::ComplianceRejected { .. } => MissionStatus::Failed,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NeedsClarification { .. } => "intent_confidence_below_threshold",
            Self::ComplianceRejected { .. } => "compliance_rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
    Continue,
    Halt(GateHalt),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatePolicy {
    pub min_intent_confidence: f64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self { min_intent_confidence: 0.7 }
    }
}

impl GatePolicy {
    pub fn new(min_intent_confidence: f64) -> Self {
        Self { min_intent_confidence }
    }

    /// Decides whether the pipeline may move past the stage that produced `output`.
    pub fn evaluate(&self, output: &StageOutput) -> GateDecision {
        match output {
            StageOutput::Intent(intent) if intent.confidence_score < self.min_intent_confidence => {
                GateDecision::Halt(GateHalt::NeedsClarification {
                    confidence_score: intent.confidence_score,
                    threshold: self.min_intent_confidence,
                })
            }
            StageOutput::Compliance(review) if !review.approved => {
                GateDecision::Halt(GateHalt::ComplianceRejected {
                    feedback: review.feedback.clone(),
                })
            }
            _ => GateDecision::Continue,
        }
    }
}
