use std::{fmt, sync::Arc};

use chrono::Utc;
use cyberscope_model::{
    Finding, NewFinding, ScanSession, ScanStatus, ScanType, SessionId, TargetId,
};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, ScanError},
    persistence::{SessionStore, SessionTransaction},
};

/// Recorded when a failure arrives without any text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Scan failed without a diagnostic message";

const MAX_PROGRESS: f64 = 100.0;

/// Result of a mutation. `Ignored` means the session was in a state where the
/// operation does not apply; the snapshot is returned unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(ScanSession),
    Ignored(ScanSession),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn session(&self) -> &ScanSession {
        match self {
            Transition::Applied(session) | Transition::Ignored(session) => session,
        }
    }

    pub fn into_session(self) -> ScanSession {
        match self {
            Transition::Applied(session) | Transition::Ignored(session) => session,
        }
    }
}

/// Owns every write to a scan session. Each operation runs in its own
/// storage transaction: read for update, validate, write, commit.
#[derive(Clone)]
pub struct ScanSessionMachine {
    store: Arc<dyn SessionStore>,
}

impl fmt::Debug for ScanSessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSessionMachine")
            .field("store", &"SessionStore")
            .finish()
    }
}

impl ScanSessionMachine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn create(&self, target_id: TargetId, scan_type: ScanType) -> Result<ScanSession> {
        let session = ScanSession::new(target_id, scan_type);
        let mut tx = self.store.begin().await?;
        tx.create_session(&session).await?;
        tx.commit().await?;
        info!(session = %session.id, target_id = %target_id, scan_type = %scan_type, "scan session created");
        Ok(session)
    }

    pub async fn transition_to_running(&self, id: SessionId) -> Result<Transition> {
        let (mut tx, mut session) = self.load_for_update(id).await?;
        if session.status != ScanStatus::Pending {
            warn!(session = %id, status = %session.status, "ignoring start of non-pending session");
            return Ok(Transition::Ignored(session));
        }

        session.status = ScanStatus::Running;
        session.progress = 0.0;
        tx.update_session(&session).await?;
        tx.commit().await?;
        info!(session = %id, "scan session running");
        Ok(Transition::Applied(session))
    }

    /// Records progress for a running session. Values are clamped to
    /// `0..=100` (NaN counts as 0) and never move progress backwards.
    pub async fn update_progress(&self, id: SessionId, value: f64) -> Result<Transition> {
        let value = clamp_progress(value);
        let (mut tx, mut session) = self.load_for_update(id).await?;
        if session.status != ScanStatus::Running {
            warn!(session = %id, status = %session.status, progress = value, "ignoring progress for non-running session");
            return Ok(Transition::Ignored(session));
        }
        if value < session.progress {
            debug!(session = %id, stored = session.progress, requested = value, "ignoring progress regression");
            return Ok(Transition::Ignored(session));
        }

        session.progress = value;
        tx.update_session(&session).await?;
        tx.commit().await?;
        debug!(session = %id, progress = value, "scan progress updated");
        Ok(Transition::Applied(session))
    }

    /// Marks a running session completed and stores its findings in the same
    /// transaction.
    pub async fn complete(&self, id: SessionId, drafts: Vec<NewFinding>) -> Result<Transition> {
        let (mut tx, mut session) = self.load_for_update(id).await?;
        if session.status != ScanStatus::Running {
            warn!(session = %id, status = %session.status, "ignoring completion of non-running session");
            return Ok(Transition::Ignored(session));
        }

        let findings: Vec<Finding> = drafts
            .into_iter()
            .map(|draft| Finding::from_new(id, draft))
            .collect();

        session.status = ScanStatus::Completed;
        session.progress = MAX_PROGRESS;
        session.completed_at = Some(Utc::now());
        tx.update_session(&session).await?;
        tx.insert_findings(&findings).await?;
        tx.commit().await?;
        info!(session = %id, findings = findings.len(), "scan session completed");
        Ok(Transition::Applied(session))
    }

    pub async fn fail(&self, id: SessionId, error_message: &str) -> Result<Transition> {
        let (mut tx, mut session) = self.load_for_update(id).await?;
        if session.status.is_terminal() {
            warn!(session = %id, status = %session.status, "ignoring failure of terminal session");
            return Ok(Transition::Ignored(session));
        }

        let message = match error_message.trim() {
            "" => GENERIC_FAILURE_MESSAGE,
            trimmed => trimmed,
        };

        session.status = ScanStatus::Failed;
        session.completed_at = Some(Utc::now());
        session.error_message.get_or_insert_with(|| message.to_string());
        tx.update_session(&session).await?;
        tx.commit().await?;
        warn!(session = %id, error = message, "scan session failed");
        Ok(Transition::Applied(session))
    }

    pub async fn get(&self, id: SessionId) -> Result<ScanSession> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| ScanError::session_not_found(id))
    }

    /// Findings ordered by port, then protocol.
    pub async fn findings(&self, id: SessionId) -> Result<Vec<Finding>> {
        self.get(id).await?;
        self.store.list_findings(id).await
    }

    async fn load_for_update(
        &self,
        id: SessionId,
    ) -> Result<(Box<dyn SessionTransaction>, ScanSession)> {
        let mut tx = self.store.begin().await?;
        let session = tx
            .session_for_update(id)
            .await?
            .ok_or_else(|| ScanError::session_not_found(id))?;
        Ok((tx, session))
    }
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_PROGRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryStore;
    use cyberscope_model::Severity;

    fn machine() -> ScanSessionMachine {
        ScanSessionMachine::new(Arc::new(InMemoryStore::new()))
    }

    fn draft(port: u16) -> NewFinding {
        NewFinding {
            port,
            protocol: "tcp".into(),
            state: "open".into(),
            service: None,
            version: None,
            severity: Severity::Info,
        }
    }

    #[test]
    fn clamps_progress() {
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(-3.0), 0.0);
        assert_eq!(clamp_progress(150.0), 100.0);
        assert_eq!(clamp_progress(f64::INFINITY), 100.0);
        assert_eq!(clamp_progress(42.5), 42.5);
    }

    #[tokio::test]
    async fn create_records_pending_session_with_arguments() {
        let machine = machine();
        let session = machine.create(TargetId::new(), ScanType::Full).await.unwrap();
        assert_eq!(session.status, ScanStatus::Pending);
        assert_eq!(session.progress, 0.0);
        assert_eq!(session.scan_arguments, "-sV -T4 -p-");
        assert_eq!(machine.get(session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn happy_path_reaches_completed() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;

        assert!(machine.transition_to_running(id).await.unwrap().is_applied());
        assert!(machine.update_progress(id, 10.0).await.unwrap().is_applied());
        let done = machine.complete(id, vec![draft(80), draft(22)]).await.unwrap();

        let session = done.session();
        assert!(done.is_applied());
        assert_eq!(session.status, ScanStatus::Completed);
        assert_eq!(session.progress, 100.0);
        assert!(session.completed_at.is_some());
        assert!(session.error_message.is_none());

        let ports: Vec<u16> = machine.findings(id).await.unwrap().iter().map(|f| f.port).collect();
        assert_eq!(ports, vec![22, 80]);
    }

    #[tokio::test]
    async fn progress_regressions_are_ignored() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;
        machine.transition_to_running(id).await.unwrap();

        machine.update_progress(id, 70.0).await.unwrap();
        let outcome = machine.update_progress(id, 10.0).await.unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(machine.get(id).await.unwrap().progress, 70.0);

        machine.update_progress(id, 70.0).await.unwrap();
        assert_eq!(machine.get(id).await.unwrap().progress, 70.0);
    }

    #[tokio::test]
    async fn progress_requires_running() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;
        let outcome = machine.update_progress(id, 50.0).await.unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(machine.get(id).await.unwrap().progress, 0.0);
    }

    #[tokio::test]
    async fn terminal_states_are_sticky() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;
        machine.transition_to_running(id).await.unwrap();
        machine.fail(id, "nmap exploded").await.unwrap();
        let failed = machine.get(id).await.unwrap();

        assert!(!machine.transition_to_running(id).await.unwrap().is_applied());
        assert!(!machine.update_progress(id, 90.0).await.unwrap().is_applied());
        assert!(!machine.complete(id, vec![draft(22)]).await.unwrap().is_applied());
        assert!(!machine.fail(id, "second failure").await.unwrap().is_applied());

        assert_eq!(machine.get(id).await.unwrap(), failed);
        assert_eq!(failed.error_message.as_deref(), Some("nmap exploded"));
        assert!(machine.findings(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_session_can_fail_and_blank_message_is_replaced() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;
        let outcome = machine.fail(id, "   ").await.unwrap();
        let session = outcome.into_session();
        assert_eq!(session.status, ScanStatus::Failed);
        assert_eq!(session.progress, 0.0);
        assert!(session.completed_at.is_some());
        assert_eq!(session.error_message.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn completion_requires_running() {
        let machine = machine();
        let id = machine.create(TargetId::new(), ScanType::Basic).await.unwrap().id;
        assert!(!machine.complete(id, vec![draft(22)]).await.unwrap().is_applied());
        assert_eq!(machine.get(id).await.unwrap().status, ScanStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_sessions_are_not_found() {
        let machine = machine();
        let id = SessionId::new();
        assert!(matches!(machine.get(id).await, Err(ScanError::NotFound(_))));
        assert!(matches!(machine.findings(id).await, Err(ScanError::NotFound(_))));
        assert!(matches!(machine.transition_to_running(id).await, Err(ScanError::NotFound(_))));
        assert!(matches!(machine.update_progress(id, 1.0).await, Err(ScanError::NotFound(_))));
        assert!(matches!(machine.complete(id, vec![]).await, Err(ScanError::NotFound(_))));
        assert!(matches!(machine.fail(id, "x").await, Err(ScanError::NotFound(_))));
    }
}
