use std::sync::Arc;

use herald_agent::{MissionOrchestrator, OpenAiClient, WorkflowOutcome};
use herald_core::domain::mission::{Mission, UserId};
use herald_db::{MissionRepository, SqlMissionStore};

use crate::commands::{async_runtime, load_config, open_database, CommandResult, StepFailure};

/// Creates one mission and runs its workflow to a resting status before returning.
pub fn run(user_id: &str, prompt: &str) -> CommandResult {
    let (user_id, prompt) = (user_id.trim(), prompt.trim());
    if user_id.is_empty() || prompt.is_empty() {
        let message = "--user and --prompt are required";
        return CommandResult::failure("run", "invalid_input", message, 9);
    }

    let config = match load_config("run") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("run") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let llm = OpenAiClient::from_config(&config.llm)
            .map_err(|error| ("llm_setup", error.to_string(), 6u8))?;
        let store = Arc::new(SqlMissionStore::new(pool.clone()));
        let orchestrator = MissionOrchestrator::new(store.clone(), Arc::new(llm), &config.pipeline);

        let mission = Mission::new(UserId(user_id.to_string()), prompt);
        store
            .create_mission(mission.clone())
            .await
            .map_err(|error| ("store", error.to_string(), 7u8))?;
        let outcome = orchestrator
            .run_workflow(&mission.id)
            .await
            .map_err(|error| ("store", error.to_string(), 7u8))?;

        pool.close().await;
        Ok::<_, StepFailure>((mission, outcome))
    });

    let (mission, outcome) = match result {
        Ok(finished) => finished,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("run", error_class, message, exit_code);
        }
    };

    let message = match &outcome {
        WorkflowOutcome::Completed => "mission completed; posts scheduled".to_string(),
        WorkflowOutcome::WaitingClarification { confidence_score } => format!(
            "intent confidence {confidence_score} is below {}; clarification needed",
            config.pipeline.min_intent_confidence
        ),
        WorkflowOutcome::Rejected { feedback } => {
            format!("compliance review rejected the content: {feedback}")
        }
        WorkflowOutcome::Failed { message } => format!("workflow failed: {message}"),
        WorkflowOutcome::MissionNotFound => {
            return CommandResult::failure(
                "run",
                "store",
                format!("mission {} vanished before its workflow started", mission.id),
                7,
            );
        }
    };

    let status = outcome.status().map(|status| status.as_str()).unwrap_or("pending");
    CommandResult::mission("run", &mission.id.0, status, message)
}
