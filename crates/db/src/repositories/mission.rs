use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use herald_core::domain::agent_log::{AgentLog, AgentLogId, AgentName, LogType, NewAgentLog};
use herald_core::domain::mission::{Mission, MissionId, MissionStatus, UserId};
use herald_core::domain::stage::{MissionMetadata, StageOutput};

use super::{AgentLogRepository, MissionRepository, RepositoryError};
use crate::DbPool;

/// SQLite-backed mission and agent log store.
pub struct SqlMissionStore {
    pool: DbPool,
}

impl SqlMissionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn count_missions(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM mission").fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn decode<T>(row: &SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_mission(row: &SqliteRow) -> Result<Mission, RepositoryError> {
    let status: String = decode(row, "status")?;
    let metadata: String = decode(row, "metadata")?;
    let created_at: String = decode(row, "created_at")?;

    let status = MissionStatus::parse(&status).ok_or_else(|| {
        RepositoryError::Decode(format!("status: unknown mission status `{status}`"))
    })?;
    let metadata: MissionMetadata = serde_json::from_str(&metadata)
        .map_err(|e| RepositoryError::Decode(format!("metadata: {e}")))?;

    Ok(Mission {
        id: MissionId(decode(row, "id")?),
        user_id: UserId(decode(row, "user_id")?),
        prompt: decode(row, "prompt")?,
        status,
        metadata,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

fn row_to_agent_log(row: &SqliteRow) -> Result<AgentLog, RepositoryError> {
    let agent_name: String = decode(row, "agent_name")?;
    let log_type: String = decode(row, "log_type")?;
    let data: Option<String> = decode(row, "data")?;
    let created_at: String = decode(row, "created_at")?;

    let agent_name = AgentName::parse(&agent_name).ok_or_else(|| {
        RepositoryError::Decode(format!("agent_name: unknown agent `{agent_name}`"))
    })?;
    let log_type = LogType::parse(&log_type).ok_or_else(|| {
        RepositoryError::Decode(format!("log_type: unknown log type `{log_type}`"))
    })?;
    let data = data
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| RepositoryError::Decode(format!("data: {e}")))?;

    Ok(AgentLog {
        id: AgentLogId(decode(row, "id")?),
        mission_id: MissionId(decode(row, "mission_id")?),
        agent_name,
        message: decode(row, "message")?,
        log_type,
        data,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl MissionRepository for SqlMissionStore {
    async fn create_mission(&self, mission: Mission) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&mission.metadata)
            .map_err(|e| RepositoryError::Decode(format!("metadata: {e}")))?;
        let created_at = mission.created_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO mission (id, user_id, prompt, status, metadata, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&mission.id.0)
        .bind(&mission.user_id.0)
        .bind(&mission.prompt)
        .bind(mission.status.as_str())
        .bind(metadata)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::AlreadyExists(mission.id.0.clone())
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(())
    }

    async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, prompt, status, metadata, created_at
             FROM mission WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_mission).transpose()
    }

    async fn list_missions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Mission>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, prompt, status, metadata, created_at
             FROM mission WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_mission).collect()
    }

    async fn update_mission_status(
        &self,
        id: &MissionId,
        status: MissionStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE mission SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.0.clone()));
        }
        Ok(())
    }

    // Single statement so concurrent writers of different stages cannot drop each other's entry.
    async fn update_mission_metadata(
        &self,
        id: &MissionId,
        output: &StageOutput,
    ) -> Result<(), RepositoryError> {
        let path = format!("$.{}", output.key().as_str());
        let result = output
            .result_json()
            .and_then(|value| serde_json::to_string(&value))
            .map_err(|e| RepositoryError::Decode(format!("metadata: {e}")))?;

        let outcome = sqlx::query(
            "UPDATE mission
             SET metadata = json_set(COALESCE(metadata, '{}'), ?, json(?)), updated_at = ?
             WHERE id = ?",
        )
        .bind(path)
        .bind(result)
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.0.clone()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AgentLogRepository for SqlMissionStore {
    async fn create_agent_log(&self, entry: NewAgentLog) -> Result<AgentLog, RepositoryError> {
        let log = AgentLog::from_new(AgentLogId::generate(), entry, Utc::now());
        let data = log
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Decode(format!("data: {e}")))?;

        sqlx::query(
            "INSERT INTO agent_log (id, mission_id, agent_name, message, log_type, data, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&log.id.0)
        .bind(&log.mission_id.0)
        .bind(log.agent_name.as_str())
        .bind(&log.message)
        .bind(log.log_type.as_str())
        .bind(data)
        .bind(log.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(log)
    }

    async fn get_agent_logs(
        &self,
        mission_id: &MissionId,
    ) -> Result<Vec<AgentLog>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, mission_id, agent_name, message, log_type, data, created_at
             FROM agent_log WHERE mission_id = ?
             ORDER BY seq ASC",
        )
        .bind(&mission_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_agent_log).collect()
    }
}
