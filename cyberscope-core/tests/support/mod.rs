#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cyberscope_core::{
    DispatcherConfig, PrivilegeProbe, PrivilegeStatus, RawReport, Result, ScanEngine, ScanError,
    ScanProfile, ScannerInvoker,
};
use tokio::sync::Notify;

pub const THREE_OPEN_PORTS: &str = include_str!("../fixtures/three_open_ports.xml");

pub const DENIED_DIAGNOSTIC: &str = "nmap requires elevated privileges";
pub const REMEDIATION: &str = "sudo setcap cap_net_raw,cap_net_admin=eip $(which nmap)";

#[derive(Debug, Clone)]
pub enum ScannerBehavior {
    Report(String),
    ToolFailure(String),
    Timeout,
}

/// Scanner double that counts invocations and can be held at a gate.
#[derive(Debug)]
pub struct FakeScanner {
    behavior: ScannerBehavior,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeScanner {
    pub fn new(behavior: ScannerBehavior) -> Self {
        Self {
            behavior,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn gated(behavior: ScannerBehavior, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(behavior)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScannerInvoker for FakeScanner {
    async fn invoke(
        &self,
        _target: &str,
        _profile: &ScanProfile,
        timeout: Duration,
    ) -> Result<RawReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.behavior {
            ScannerBehavior::Report(xml) => Ok(RawReport {
                xml: xml.clone(),
                diagnostics: String::new(),
                elapsed: Duration::from_millis(5),
            }),
            ScannerBehavior::ToolFailure(msg) => Err(ScanError::ToolInvocation(msg.clone())),
            ScannerBehavior::Timeout => Err(ScanError::Timeout(timeout)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FakeProbe {
    pub granted: bool,
}

#[async_trait]
impl PrivilegeProbe for FakeProbe {
    async fn check(&self) -> PrivilegeStatus {
        if self.granted {
            PrivilegeStatus::granted("test host is privileged")
        } else {
            PrivilegeStatus::denied(DENIED_DIAGNOSTIC)
        }
    }

    fn instructions(&self) -> String {
        format!("To grant nmap the required privileges:\n  {REMEDIATION}")
    }
}

pub fn engine_with(scanner: Arc<FakeScanner>, granted: bool) -> ScanEngine {
    ScanEngine::in_memory(
        scanner,
        Arc::new(FakeProbe { granted }),
        DispatcherConfig {
            scan_timeout: Duration::from_secs(30),
        },
    )
}
