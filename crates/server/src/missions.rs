//! Mission trigger and observation routes.
//!
//! - `POST /api/missions`               create a mission and launch its workflow
//! - `GET  /api/missions?user_id=`      missions of one user, newest first
//! - `GET  /api/missions/{id}`          one mission with its stage results
//! - `GET  /api/missions/{id}/logs`     the mission's agent logs in insertion order

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use herald_agent::MissionRuntime;
use herald_core::domain::agent_log::AgentLog;
use herald_core::domain::mission::{Mission, MissionId, UserId};
use herald_core::errors::{ApplicationError, InterfaceError};
use herald_db::{AgentLogRepository, MissionRepository, MissionStore, RepositoryError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct MissionsState {
    store: Arc<dyn MissionStore>,
    runtime: MissionRuntime,
}

impl MissionsState {
    pub fn new(store: Arc<dyn MissionStore>, runtime: MissionRuntime) -> Self {
        Self { store, runtime }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMissionRequest {
    pub user_id: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMissionsQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: MissionsState) -> Router {
    Router::new()
        .route("/api/missions", post(create_mission).get(list_missions))
        .route("/api/missions/{id}", get(get_mission))
        .route("/api/missions/{id}/logs", get(get_mission_logs))
        .with_state(state)
}

async fn create_mission(
    State(state): State<MissionsState>,
    Json(body): Json<CreateMissionRequest>,
) -> Result<(StatusCode, Json<Mission>), ApiError> {
    let user_id = body.user_id.trim();
    let prompt = body.prompt.trim();
    if user_id.is_empty() || prompt.is_empty() {
        return Err(interface_error(InterfaceError::BadRequest {
            message: "user_id and prompt are required".to_string(),
            correlation_id: correlation_id(),
        }));
    }

    let mission = Mission::new(UserId(user_id.to_string()), prompt);
    state.store.create_mission(mission.clone()).await.map_err(store_error)?;

    // The caller observes progress through the read routes; the handle is detached.
    let handle = state.runtime.launch(mission.id.clone());
    info!(
        event_name = "api.mission.created",
        mission_id = %handle.mission_id(),
        user_id = %mission.user_id.0,
        "mission created and workflow launched"
    );

    Ok((StatusCode::CREATED, Json(mission)))
}

async fn list_missions(
    State(state): State<MissionsState>,
    Query(query): Query<ListMissionsQuery>,
) -> Result<Json<Vec<Mission>>, ApiError> {
    let missions = state
        .store
        .list_missions_for_user(&UserId(query.user_id))
        .await
        .map_err(store_error)?;
    Ok(Json(missions))
}

async fn get_mission(
    State(state): State<MissionsState>,
    Path(id): Path<String>,
) -> Result<Json<Mission>, ApiError> {
    let mission_id = MissionId(id);
    match state.store.get_mission(&mission_id).await.map_err(store_error)? {
        Some(mission) => Ok(Json(mission)),
        None => Err(not_found(&mission_id)),
    }
}

async fn get_mission_logs(
    State(state): State<MissionsState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AgentLog>>, ApiError> {
    let mission_id = MissionId(id);
    if state.store.get_mission(&mission_id).await.map_err(store_error)?.is_none() {
        return Err(not_found(&mission_id));
    }
    let logs = state.store.get_agent_logs(&mission_id).await.map_err(store_error)?;
    Ok(Json(logs))
}

fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

fn not_found(mission_id: &MissionId) -> ApiError {
    let interface = ApplicationError::NotFound(format!("mission {mission_id}"));
    interface_error(interface.into_interface(correlation_id()))
}

fn store_error(source: RepositoryError) -> ApiError {
    let interface = match source {
        RepositoryError::NotFound(message) => ApplicationError::NotFound(message),
        RepositoryError::Decode(message) => ApplicationError::CorruptRecord(message),
        other => ApplicationError::Persistence(other.to_string()),
    }
    .into_interface(correlation_id());

    error!(
        event_name = "api.mission.store_error",
        correlation_id = interface.correlation_id(),
        error = %interface,
        "mission store request failed"
    );
    interface_error(interface)
}

fn interface_error(error: InterfaceError) -> ApiError {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorBody {
        error: error.user_message().to_string(),
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body))
}
