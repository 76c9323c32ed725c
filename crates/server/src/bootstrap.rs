use std::sync::Arc;

use herald_agent::{CompletionError, MissionOrchestrator, MissionRuntime, OpenAiClient};
use herald_core::config::{AppConfig, ConfigError, LlmProvider, LoadOptions};
use herald_db::{connect_with_config, migrations, DbPool, MissionStore, SqlMissionStore};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub store: Arc<dyn MissionStore>,
    pub runtime: MissionRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] CompletionError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    if config.llm.provider == LlmProvider::OpenAi && !config.llm.has_api_key() {
        // Not fatal: every mission will fail at its first agent with a configuration error.
        warn!(
            event_name = "system.bootstrap.llm_key_missing",
            "no llm api key configured; missions will fail until one is set"
        );
    }

    let llm = OpenAiClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        model = llm.model(),
        base_url = %config.llm.effective_base_url(),
        "llm client initialized"
    );

    let store: Arc<dyn MissionStore> = Arc::new(SqlMissionStore::new(db_pool.clone()));
    let orchestrator = MissionOrchestrator::new(store.clone(), Arc::new(llm), &config.pipeline);

    Ok(Application { config, db_pool, store, runtime: MissionRuntime::new(Arc::new(orchestrator)) })
}

#[cfg(test)]
mod tests {
    use herald_core::config::{ConfigOverrides, LoadOptions};
    use herald_core::domain::mission::{Mission, UserId};
    use herald_db::MissionRepository;

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                database_max_connections: Some(1),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_store() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('mission', 'agent_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count tables");
        assert_eq!(table_count, 2);

        let mission = Mission::new(UserId("U-1".to_string()), "Find SaaS founders in London");
        app.store.create_mission(mission.clone()).await.expect("create mission");
        assert!(app.store.get_mission(&mission.id).await.expect("get").is_some());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_reports_unreachable_database() {
        let result = bootstrap(overrides("sqlite:///nonexistent-dir/nested/herald.db")).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }
}
