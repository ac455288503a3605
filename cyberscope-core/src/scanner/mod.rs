//! Contract with the external scanning tool.

mod nmap;

use std::time::Duration;

use async_trait::async_trait;
use cyberscope_model::{ScanSession, ScanType};

use crate::error::Result;

pub use nmap::NmapInvoker;

/// Fixed argument set for one invocation. The target is the only
/// caller-controlled token and is appended by the invoker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProfile {
    pub scan_type: ScanType,
}

impl ScanProfile {
    pub fn new(scan_type: ScanType) -> Self {
        Self { scan_type }
    }

    pub fn for_session(session: &ScanSession) -> Self {
        Self::new(session.scan_type)
    }

    pub fn arguments(&self) -> &'static [&'static str] {
        self.scan_type.nmap_arguments()
    }
}

/// Unparsed scanner output.
#[derive(Debug, Clone)]
pub struct RawReport {
    pub xml: String,
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Runs one scan and returns the tool's structured report.
///
/// Implementations must give up once `timeout` elapses and return
/// [`ScanError::Timeout`](crate::ScanError::Timeout).
#[async_trait]
pub trait ScannerInvoker: Send + Sync {
    async fn invoke(
        &self,
        target: &str,
        profile: &ScanProfile,
        timeout: Duration,
    ) -> Result<RawReport>;
}
