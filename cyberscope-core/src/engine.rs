use std::{fmt, sync::Arc};

use cyberscope_model::{
    Finding, FindingId, ScanSession, ScanType, SessionId, Target, TargetId,
};
use serde::Serialize;
use tracing::info;

use crate::{
    error::{Result, ScanError},
    orchestration::{DispatcherConfig, InFlightRegistry, LaunchOutcome, ScanDispatcher},
    persistence::{InMemoryStore, SessionStore, TargetStore},
    privilege::PrivilegeProbe,
    scanner::ScannerInvoker,
    session::ScanSessionMachine,
    target::{TargetValidation, validate_target},
};

/// Default page size for [`ScanEngine::recent_sessions`] callers.
pub const RECENT_SESSIONS_LIMIT: usize = 50;

/// A stored target together with the validation that admitted it.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTarget {
    pub target: Target,
    pub validation: TargetValidation,
}

impl RegisteredTarget {
    pub fn warning(&self) -> Option<&'static str> {
        self.validation.warning()
    }
}

/// Everything produced by [`ScanEngine::submit_scan`].
#[derive(Debug)]
pub struct SubmittedScan {
    pub target: RegisteredTarget,
    pub session: ScanSession,
    pub launch: LaunchOutcome,
}

/// Public entry point of the scan engine.
#[derive(Clone)]
pub struct ScanEngine {
    machine: ScanSessionMachine,
    targets: Arc<dyn TargetStore>,
    dispatcher: ScanDispatcher,
}

impl fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanEngine")
            .field("targets", &"TargetStore")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl ScanEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        targets: Arc<dyn TargetStore>,
        scanner: Arc<dyn ScannerInvoker>,
        privileges: Arc<dyn PrivilegeProbe>,
        config: DispatcherConfig,
    ) -> Self {
        let machine = ScanSessionMachine::new(sessions);
        let dispatcher = ScanDispatcher::new(machine.clone(), scanner, privileges, config);
        Self {
            machine,
            targets,
            dispatcher,
        }
    }

    /// Engine backed by a fresh [`InMemoryStore`].
    pub fn in_memory(
        scanner: Arc<dyn ScannerInvoker>,
        privileges: Arc<dyn PrivilegeProbe>,
        config: DispatcherConfig,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, scanner, privileges, config)
    }

    pub fn validate(&self, address: &str) -> TargetValidation {
        validate_target(address)
    }

    /// Validates `address` and returns its stored target, creating it on
    /// first use.
    pub async fn register_target(&self, address: &str) -> Result<RegisteredTarget> {
        let validation = validate_target(address);
        if !validation.valid {
            let reason = validation.reason.as_deref().unwrap_or("invalid address");
            return Err(ScanError::Validation(format!("{:?}: {reason}", address.trim())));
        }

        let target = self
            .targets
            .find_or_create_target(&validation.normalized, validation.is_private)
            .await?;
        Ok(RegisteredTarget { target, validation })
    }

    pub async fn create_session(&self, target_id: TargetId, scan_type: ScanType) -> Result<ScanSession> {
        if self.targets.get_target(target_id).await?.is_none() {
            return Err(ScanError::NotFound(format!("target {target_id}")));
        }
        self.machine.create(target_id, scan_type).await
    }

    pub async fn start_scan(
        &self,
        session_id: SessionId,
        target_address: &str,
    ) -> Result<LaunchOutcome> {
        self.dispatcher.start_scan(session_id, target_address).await
    }

    /// Starts an existing session against the target it was created for.
    pub async fn start_session(&self, session_id: SessionId) -> Result<LaunchOutcome> {
        let session = self.machine.get(session_id).await?;
        let target = self.get_target(session.target_id).await?;
        self.start_scan(session_id, &target.address).await
    }

    /// Registers the target, creates a session, and launches it.
    pub async fn submit_scan(&self, address: &str, scan_type: ScanType) -> Result<SubmittedScan> {
        let target = self.register_target(address).await?;
        let session = self.machine.create(target.target.id, scan_type).await?;
        let launch = self.start_scan(session.id, &target.target.address).await?;
        info!(
            session = %session.id,
            scan_target = %target.target.address,
            launched = launch.is_launched(),
            "scan submitted"
        );
        Ok(SubmittedScan {
            target,
            session,
            launch,
        })
    }

    pub async fn get_session(&self, id: SessionId) -> Result<ScanSession> {
        self.machine.get(id).await
    }

    pub async fn get_findings(&self, id: SessionId) -> Result<Vec<Finding>> {
        self.machine.findings(id).await
    }

    pub async fn get_finding(&self, id: FindingId) -> Result<Finding> {
        self.machine
            .store()
            .get_finding(id)
            .await?
            .ok_or_else(|| ScanError::NotFound(format!("finding {id}")))
    }

    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<ScanSession>> {
        self.machine.store().recent_sessions(limit).await
    }

    pub async fn get_target(&self, id: TargetId) -> Result<Target> {
        self.targets
            .get_target(id)
            .await?
            .ok_or_else(|| ScanError::NotFound(format!("target {id}")))
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        self.dispatcher.registry()
    }
}
