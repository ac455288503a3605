use std::{fmt, sync::Arc, time::Duration};

use cyberscope_model::{ScanSession, ScanStatus, SessionId};
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, error, info, info_span, warn};

use super::registry::{InFlightClaim, InFlightRegistry};
use crate::{
    error::{Result, ScanError},
    privilege::PrivilegeProbe,
    report::{parse_report, project_findings},
    scanner::{ScanProfile, ScannerInvoker},
    session::ScanSessionMachine,
};

/// Progress recorded once the execution task is running.
pub const PROGRESS_STARTED: f64 = 10.0;
/// Progress recorded once the scanner returned a report.
pub const PROGRESS_SCANNED: f64 = 70.0;
/// Progress recorded once the report has been normalized.
pub const PROGRESS_PARSED: f64 = 90.0;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(900);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on one scanner invocation.
    pub scan_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// Result of [`ScanDispatcher::start_scan`].
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The session is running and an execution task was spawned.
    Launched(ScanHandle),
    /// The privilege pre-flight failed; the session was marked failed.
    Rejected { session: ScanSession, reason: String },
}

impl LaunchOutcome {
    pub fn is_launched(&self) -> bool {
        matches!(self, LaunchOutcome::Launched(_))
    }
}

/// Handle to a spawned execution. Dropping it detaches the task.
#[derive(Debug)]
pub struct ScanHandle {
    session_id: SessionId,
    task: JoinHandle<()>,
}

impl ScanHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the execution to reach a terminal state.
    pub async fn wait(self) -> std::result::Result<(), JoinError> {
        self.task.await
    }
}

/// Runs pre-flight checks and supervises exactly one execution per session.
#[derive(Clone)]
pub struct ScanDispatcher {
    machine: ScanSessionMachine,
    scanner: Arc<dyn ScannerInvoker>,
    privileges: Arc<dyn PrivilegeProbe>,
    registry: InFlightRegistry,
    config: DispatcherConfig,
}

impl fmt::Debug for ScanDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanDispatcher")
            .field("machine", &self.machine)
            .field("scanner", &"ScannerInvoker")
            .field("privileges", &"PrivilegeProbe")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl ScanDispatcher {
    pub fn new(
        machine: ScanSessionMachine,
        scanner: Arc<dyn ScannerInvoker>,
        privileges: Arc<dyn PrivilegeProbe>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            machine,
            scanner,
            privileges,
            registry: InFlightRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Launches a scan of `target_address` for a pending session.
    ///
    /// Returns without waiting for the scan. `AlreadyRunning`, `NotFound`
    /// and `SessionTerminal` are reported synchronously; a failed privilege
    /// pre-flight yields [`LaunchOutcome::Rejected`].
    pub async fn start_scan(
        &self,
        session_id: SessionId,
        target_address: &str,
    ) -> Result<LaunchOutcome> {
        let claim = self
            .registry
            .claim(session_id, target_address)
            .ok_or(ScanError::AlreadyRunning(session_id))?;

        let session = self.machine.get(session_id).await?;
        Self::ensure_launchable(&session)?;

        let privileges = self.privileges.check().await;
        if !privileges.ok {
            let reason = privilege_failure_message(&privileges.diagnostic, &self.privileges.instructions());
            warn!(session = %session_id, diagnostic = %privileges.diagnostic, "privilege pre-flight failed");
            let session = self.machine.fail(session_id, &reason).await?.into_session();
            return Ok(LaunchOutcome::Rejected { session, reason });
        }

        let transition = self.machine.transition_to_running(session_id).await?;
        if !transition.is_applied() {
            Self::ensure_launchable(transition.session())?;
        }
        let session = transition.into_session();

        let span = info_span!("scan_execution", session = %session_id, scan_target = %target_address);
        let execution = Execution {
            machine: self.machine.clone(),
            scanner: Arc::clone(&self.scanner),
            timeout: self.config.scan_timeout,
            profile: ScanProfile::for_session(&session),
            target: target_address.to_string(),
            session_id,
        };
        let task = tokio::spawn(execution.run(claim).instrument(span));
        info!(session = %session_id, scan_target = %target_address, "scan launched");

        Ok(LaunchOutcome::Launched(ScanHandle { session_id, task }))
    }

    fn ensure_launchable(session: &ScanSession) -> Result<()> {
        match session.status {
            ScanStatus::Pending => Ok(()),
            ScanStatus::Running => Err(ScanError::AlreadyRunning(session.id)),
            ScanStatus::Completed | ScanStatus::Failed => {
                Err(ScanError::SessionTerminal(session.id))
            }
        }
    }
}

/// Error text recorded when the privilege pre-flight fails.
pub(crate) fn privilege_failure_message(diagnostic: &str, instructions: &str) -> String {
    let instructions = instructions.trim();
    if instructions.is_empty() {
        ScanError::Privilege(diagnostic.to_string()).to_string()
    } else {
        format!("{}\n\n{instructions}", ScanError::Privilege(diagnostic.to_string()))
    }
}

struct Execution {
    machine: ScanSessionMachine,
    scanner: Arc<dyn ScannerInvoker>,
    timeout: Duration,
    profile: ScanProfile,
    target: String,
    session_id: SessionId,
}

impl Execution {
    async fn run(self, _claim: InFlightClaim) {
        let Err(err) = self.drive().await else {
            return;
        };

        match err {
            ScanError::ToolInvocation(_)
            | ScanError::Timeout(_)
            | ScanError::MalformedReport(_) => {
                if let Err(store_err) = self.machine.fail(self.session_id, &err.to_string()).await
                {
                    error!(error = %store_err, cause = %err, "could not record scan failure");
                }
            }
            other => {
                error!(error = %other, "scan execution aborted; session left in last stored state");
            }
        }
    }

    async fn drive(&self) -> Result<()> {
        let id = self.session_id;
        self.machine.update_progress(id, PROGRESS_STARTED).await?;

        let raw = self
            .scanner
            .invoke(&self.target, &self.profile, self.timeout)
            .await?;
        info!(elapsed_ms = raw.elapsed.as_millis() as u64, "scanner finished");
        self.machine.update_progress(id, PROGRESS_SCANNED).await?;

        let report = parse_report(&raw.xml)?;
        let findings = project_findings(&report);
        self.machine.update_progress(id, PROGRESS_PARSED).await?;

        self.machine.complete(id, findings).await?;
        Ok(())
    }
}
