use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{
    error::ModelError,
    ids::{FindingId, SessionId},
};

/// Severity label attached to findings. The engine always records `Info`;
/// scoring happens outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(ModelError::UnknownSeverity(other.to_string())),
        }
    }
}

/// A finding that has been extracted from a report but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewFinding {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
    pub version: Option<String>,
    pub severity: Severity,
}

/// One open network service discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Finding {
    pub id: FindingId,
    pub session_id: SessionId,
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
    pub version: Option<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn from_new(session_id: SessionId, new: NewFinding) -> Self {
        Self {
            id: FindingId::new(),
            session_id,
            port: new.port,
            protocol: new.protocol,
            state: new.state,
            service: new.service,
            version: new.version,
            severity: new.severity,
            created_at: Utc::now(),
        }
    }
}
