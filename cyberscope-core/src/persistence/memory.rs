use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use cyberscope_model::{Finding, FindingId, ScanSession, SessionId, Target, TargetId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::ports::{SessionStore, SessionTransaction, TargetStore};
use crate::error::{Result, ScanError};

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<SessionId, ScanSession>,
    findings: HashMap<FindingId, Finding>,
    targets: HashMap<TargetId, Target>,
    targets_by_address: HashMap<String, TargetId>,
}

/// Process-local store. Transactions hold the store lock until they commit
/// or drop, so writes are serialized.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged_sessions: HashMap::new(),
            staged_findings: Vec::new(),
        }))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<ScanSession>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn list_findings(&self, session_id: SessionId) -> Result<Vec<Finding>> {
        let state = self.state.lock().await;
        let mut findings: Vec<Finding> = state
            .findings
            .values()
            .filter(|finding| finding.session_id == session_id)
            .cloned()
            .collect();
        findings.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.protocol.cmp(&b.protocol)));
        Ok(findings)
    }

    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>> {
        Ok(self.state.lock().await.findings.get(&id).cloned())
    }

    async fn recent_sessions(&self, limit: usize) -> Result<Vec<ScanSession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<ScanSession> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }
}

#[async_trait]
impl TargetStore for InMemoryStore {
    async fn find_or_create_target(&self, address: &str, is_rfc1918: bool) -> Result<Target> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .targets_by_address
            .get(address)
            .and_then(|id| state.targets.get(id))
        {
            return Ok(existing.clone());
        }

        let target = Target::new(address, is_rfc1918);
        state.targets_by_address.insert(target.address.clone(), target.id);
        state.targets.insert(target.id, target.clone());
        Ok(target)
    }

    async fn get_target(&self, id: TargetId) -> Result<Option<Target>> {
        Ok(self.state.lock().await.targets.get(&id).cloned())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged_sessions: HashMap<SessionId, ScanSession>,
    staged_findings: Vec<Finding>,
}

impl MemoryTransaction {
    fn knows_session(&self, id: &SessionId) -> bool {
        self.staged_sessions.contains_key(id) || self.guard.sessions.contains_key(id)
    }
}

#[async_trait]
impl SessionTransaction for MemoryTransaction {
    async fn create_session(&mut self, session: &ScanSession) -> Result<()> {
        if self.knows_session(&session.id) {
            return Err(ScanError::Storage(format!("session {} already exists", session.id)));
        }
        self.staged_sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn session_for_update(&mut self, id: SessionId) -> Result<Option<ScanSession>> {
        Ok(self
            .staged_sessions
            .get(&id)
            .or_else(|| self.guard.sessions.get(&id))
            .cloned())
    }

    async fn update_session(&mut self, session: &ScanSession) -> Result<()> {
        if !self.knows_session(&session.id) {
            return Err(ScanError::Storage(format!("session {} does not exist", session.id)));
        }
        self.staged_sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn insert_findings(&mut self, findings: &[Finding]) -> Result<()> {
        if let Some(orphan) = findings.iter().find(|f| !self.knows_session(&f.session_id)) {
            return Err(ScanError::Storage(format!(
                "finding references unknown session {}",
                orphan.session_id
            )));
        }
        self.staged_findings.extend_from_slice(findings);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            staged_sessions,
            staged_findings,
        } = *self;
        guard.sessions.extend(staged_sessions);
        guard
            .findings
            .extend(staged_findings.into_iter().map(|finding| (finding.id, finding)));
        Ok(())
    }
}
