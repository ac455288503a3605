use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{
    error::ModelError,
    ids::{SessionId, TargetId},
    scan_type::ScanType,
};

/// Lifecycle of a scan session. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "running" => Ok(ScanStatus::Running),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// One execution attempt against one target.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanSession {
    pub id: SessionId,
    pub target_id: TargetId,
    pub status: ScanStatus,
    /// Percentage in `[0.0, 100.0]`.
    pub progress: f64,
    pub scan_type: ScanType,
    pub scan_arguments: String,
    pub started_at: DateTime<Utc>,
    /// Set exactly when the session reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ScanSession {
    /// A fresh `pending` session with zero progress.
    pub fn new(target_id: TargetId, scan_type: ScanType) -> Self {
        Self {
            id: SessionId::new(),
            target_id,
            status: ScanStatus::Pending,
            progress: 0.0,
            scan_type,
            scan_arguments: scan_type.argument_line(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
