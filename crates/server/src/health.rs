use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use herald_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    llm_configured: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    /// Informational only; missions still start without a key and fail at their first agent.
    pub llm: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, llm_configured: bool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, llm_configured })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let llm = if state.llm_configured {
        HealthCheck { status: "ready", detail: "llm credentials configured".to_string() }
    } else {
        HealthCheck { status: "unconfigured", detail: "llm api key is not set".to_string() }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        llm,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mission").fetch_one(pool).await {
        Ok(missions) => {
            HealthCheck { status: "ready", detail: format!("mission store reachable ({missions})") }
        }
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("mission store query failed: {error}"),
        },
    }
}
