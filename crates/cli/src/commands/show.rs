use herald_core::domain::agent_log::AgentLog;
use herald_core::domain::mission::{Mission, MissionId};
use herald_db::{AgentLogRepository, MissionRepository, SqlMissionStore};
use serde::Serialize;

use crate::commands::{async_runtime, load_config, open_database, CommandResult, StepFailure};

#[derive(Debug, Serialize)]
struct MissionReport {
    command: &'static str,
    status: &'static str,
    mission: Mission,
    logs: Vec<AgentLog>,
}

pub fn run(mission_id: &str) -> CommandResult {
    let config = match load_config("show") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("show") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let mission_id = MissionId(mission_id.trim().to_string());
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlMissionStore::new(pool.clone());
        let store_failure = |error: herald_db::RepositoryError| ("store", error.to_string(), 7u8);

        let mission = store.get_mission(&mission_id).await.map_err(store_failure)?;
        let logs = match &mission {
            Some(mission) => store.get_agent_logs(&mission.id).await.map_err(store_failure)?,
            None => Vec::new(),
        };

        pool.close().await;
        Ok::<_, StepFailure>(mission.map(|mission| (mission, logs)))
    });

    match result {
        Ok(Some((mission, logs))) => {
            let report = MissionReport { command: "show", status: "ok", mission, logs };
            match serde_json::to_string_pretty(&report) {
                Ok(output) => CommandResult { exit_code: 0, output },
                Err(error) => {
                    CommandResult::failure("show", "serialization", error.to_string(), 10)
                }
            }
        }
        Ok(None) => CommandResult::failure(
            "show",
            "not_found",
            format!("mission {mission_id} does not exist"),
            8,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("show", error_class, message, exit_code)
        }
    }
}
