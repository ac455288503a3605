use async_trait::async_trait;
use cyberscope_model::{Finding, FindingId, ScanSession, SessionId, Target, TargetId};

use crate::error::Result;

/// Read access to sessions and findings plus the entry point for writes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens a write transaction. Dropping it without
    /// [`commit`](SessionTransaction::commit) discards every staged write.
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>>;

    async fn get_session(&self, id: SessionId) -> Result<Option<ScanSession>>;

    /// Findings of one session ordered by port, then protocol.
    async fn list_findings(&self, session_id: SessionId) -> Result<Vec<Finding>>;

    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>>;

    /// Newest sessions first.
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<ScanSession>>;
}

/// A unit of work over session records.
#[async_trait]
pub trait SessionTransaction: Send {
    async fn create_session(&mut self, session: &ScanSession) -> Result<()>;

    /// Loads a session and holds it for the rest of the transaction.
    async fn session_for_update(&mut self, id: SessionId) -> Result<Option<ScanSession>>;

    async fn update_session(&mut self, session: &ScanSession) -> Result<()>;

    async fn insert_findings(&mut self, findings: &[Finding]) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Returns the target stored under `address`, creating it on first use.
    async fn find_or_create_target(&self, address: &str, is_rfc1918: bool) -> Result<Target>;

    async fn get_target(&self, id: TargetId) -> Result<Option<Target>>;
}
