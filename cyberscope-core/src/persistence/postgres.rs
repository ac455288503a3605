use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cyberscope_model::{
    Finding, FindingId, ScanSession, ScanStatus, ScanType, SessionId, Severity, Target, TargetId,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::ports::{SessionStore, SessionTransaction, TargetStore};
use crate::error::{Result, ScanError};

const SESSION_COLUMNS: &str = "id, target_id, status, progress, scan_type, scan_arguments, \
     started_at, completed_at, error_message";
const FINDING_COLUMNS: &str =
    "id, session_id, port, protocol, state, service, version, severity, created_at";

/// Schema for the Postgres store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| ScanError::Storage(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    target_id: Uuid,
    status: String,
    progress: f64,
    scan_type: String,
    scan_arguments: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<SessionRow> for ScanSession {
    type Error = ScanError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(ScanSession {
            id: SessionId(row.id),
            target_id: TargetId(row.target_id),
            status: row.status.parse::<ScanStatus>().map_err(corrupt)?,
            progress: row.progress,
            scan_type: row.scan_type.parse::<ScanType>().map_err(corrupt)?,
            scan_arguments: row.scan_arguments,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FindingRow {
    id: Uuid,
    session_id: Uuid,
    port: i32,
    protocol: String,
    state: String,
    service: Option<String>,
    version: Option<String>,
    severity: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<FindingRow> for Finding {
    type Error = ScanError;

    fn try_from(row: FindingRow) -> Result<Self> {
        Ok(Finding {
            id: FindingId(row.id),
            session_id: SessionId(row.session_id),
            port: u16::try_from(row.port).map_err(corrupt)?,
            protocol: row.protocol,
            state: row.state,
            service: row.service,
            version: row.version,
            severity: row.severity.parse::<Severity>().map_err(corrupt)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TargetRow {
    id: Uuid,
    address: String,
    hostname: Option<String>,
    is_rfc1918: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TargetRow> for Target {
    fn from(row: TargetRow) -> Self {
        Target {
            id: TargetId(row.id),
            address: row.address,
            hostname: row.hostname,
            is_rfc1918: row.is_rfc1918,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn corrupt(err: impl fmt::Display) -> ScanError {
    ScanError::Storage(format!("corrupt row: {err}"))
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<ScanSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM scan_sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .map(ScanSession::try_from)
            .transpose()
    }

    async fn list_findings(&self, session_id: SessionId) -> Result<Vec<Finding>> {
        let sql = format!(
            "SELECT {FINDING_COLUMNS} FROM findings WHERE session_id = $1 ORDER BY port, protocol"
        );
        sqlx::query_as::<_, FindingRow>(&sql)
            .bind(session_id.0)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Finding::try_from)
            .collect()
    }

    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>> {
        let sql = format!("SELECT {FINDING_COLUMNS} FROM findings WHERE id = $1");
        sqlx::query_as::<_, FindingRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .map(Finding::try_from)
            .transpose()
    }

    async fn recent_sessions(&self, limit: usize) -> Result<Vec<ScanSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM scan_sessions ORDER BY started_at DESC, id DESC LIMIT $1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ScanSession::try_from)
            .collect()
    }
}

#[async_trait]
impl TargetStore for PostgresStore {
    async fn find_or_create_target(&self, address: &str, is_rfc1918: bool) -> Result<Target> {
        let candidate = Target::new(address, is_rfc1918);
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, TargetRow>(
            r#"
            INSERT INTO targets (id, address, hostname, is_rfc1918, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (address) DO UPDATE SET address = EXCLUDED.address
            RETURNING id, address, hostname, is_rfc1918, created_at, updated_at
            "#,
        )
        .bind(candidate.id.0)
        .bind(&candidate.address)
        .bind(&candidate.hostname)
        .bind(candidate.is_rfc1918)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_target(&self, id: TargetId) -> Result<Option<Target>> {
        let row = sqlx::query_as::<_, TargetRow>(
            "SELECT id, address, hostname, is_rfc1918, created_at, updated_at \
             FROM targets WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Target::from))
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SessionTransaction for PostgresTransaction {
    async fn create_session(&mut self, session: &ScanSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_sessions (
                id, target_id, status, progress, scan_type, scan_arguments,
                started_at, completed_at, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id.0)
        .bind(session.target_id.0)
        .bind(session.status.as_str())
        .bind(session.progress)
        .bind(session.scan_type.as_str())
        .bind(&session.scan_arguments)
        .bind(session.started_at)
        .bind(session.completed_at)
        .bind(&session.error_message)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn session_for_update(&mut self, id: SessionId) -> Result<Option<ScanSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM scan_sessions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(ScanSession::try_from)
            .transpose()
    }

    async fn update_session(&mut self, session: &ScanSession) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE scan_sessions
            SET status = $2, progress = $3, completed_at = $4, error_message = $5
            WHERE id = $1
            "#,
        )
        .bind(session.id.0)
        .bind(session.status.as_str())
        .bind(session.progress)
        .bind(session.completed_at)
        .bind(&session.error_message)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ScanError::Storage(format!("session {} does not exist", session.id)));
        }
        Ok(())
    }

    async fn insert_findings(&mut self, findings: &[Finding]) -> Result<()> {
        for finding in findings {
            sqlx::query(
                r#"
                INSERT INTO findings (
                    id, session_id, port, protocol, state, service, version, severity, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(finding.id.0)
            .bind(finding.session_id.0)
            .bind(i32::from(finding.port))
            .bind(&finding.protocol)
            .bind(&finding.state)
            .bind(&finding.service)
            .bind(&finding.version)
            .bind(finding.severity.as_str())
            .bind(finding.created_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
