use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use herald_core::domain::mission::MissionId;

use crate::orchestrator::{MissionOrchestrator, WorkflowError, WorkflowOutcome};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("mission task did not finish: {0}")]
    Join(#[from] JoinError),
}

/// Launches mission workflows as background tasks.
#[derive(Clone)]
pub struct MissionRuntime {
    orchestrator: Arc<MissionOrchestrator>,
}

impl MissionRuntime {
    pub fn new(orchestrator: Arc<MissionOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<MissionOrchestrator> {
        &self.orchestrator
    }

    /// Starts the workflow and returns at once. Must be called within a tokio runtime.
    pub fn launch(&self, mission_id: MissionId) -> MissionHandle {
        let orchestrator = self.orchestrator.clone();
        let task_mission_id = mission_id.clone();
        let task =
            tokio::spawn(async move { orchestrator.run_workflow(&task_mission_id).await });

        tracing::debug!(
            event_name = "mission.workflow.launched",
            mission_id = %mission_id,
            "mission workflow launched"
        );
        MissionHandle { mission_id, task }
    }
}

/// Handle to one launched workflow. Dropping it detaches the task; the run continues.
#[derive(Debug)]
pub struct MissionHandle {
    mission_id: MissionId,
    task: JoinHandle<Result<WorkflowOutcome, WorkflowError>>,
}

impl MissionHandle {
    pub fn mission_id(&self) -> &MissionId {
        &self.mission_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub async fn wait(self) -> Result<WorkflowOutcome, RuntimeError> {
        Ok(self.task.await??)
    }
}
