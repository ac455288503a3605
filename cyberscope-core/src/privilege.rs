//! Host privilege detection for raw-socket scanning.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

const GETCAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a privilege probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivilegeStatus {
    pub ok: bool,
    pub diagnostic: String,
}

impl PrivilegeStatus {
    pub fn granted(diagnostic: impl Into<String>) -> Self {
        Self {
            ok: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn denied(diagnostic: impl Into<String>) -> Self {
        Self {
            ok: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Decides whether the scanner can run with the privileges it needs.
#[async_trait]
pub trait PrivilegeProbe: Send + Sync {
    async fn check(&self) -> PrivilegeStatus;

    /// Remediation text shown to the user when [`check`](Self::check) fails.
    fn instructions(&self) -> String;
}

/// Operating systems with distinct privilege models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl HostPlatform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => HostPlatform::Linux,
            "macos" => HostPlatform::MacOs,
            "windows" => HostPlatform::Windows,
            other => HostPlatform::Other(other.to_string()),
        }
    }
}

/// Probe that inspects the real host: the nmap binary, its file
/// capabilities on Linux, and the effective user.
#[derive(Debug, Clone)]
pub struct SystemPrivilegeProbe {
    nmap_path: PathBuf,
    platform: HostPlatform,
}

impl SystemPrivilegeProbe {
    pub fn new(nmap_path: impl Into<PathBuf>) -> Self {
        Self {
            nmap_path: nmap_path.into(),
            platform: HostPlatform::current(),
        }
    }

    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    fn locate_nmap(&self) -> Option<PathBuf> {
        if self.nmap_path.components().count() > 1 {
            return self.nmap_path.is_file().then(|| self.nmap_path.clone());
        }
        which::which(&self.nmap_path).ok()
    }

    async fn has_raw_socket_capabilities(binary: &Path) -> bool {
        let probe = Command::new("getcap")
            .arg(binary)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(GETCAP_TIMEOUT, probe).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                stdout.contains("cap_net_raw") && stdout.contains("cap_net_admin")
            }
            Ok(Err(err)) => {
                debug!(error = %err, "getcap unavailable");
                false
            }
            Err(_) => {
                debug!("getcap timed out");
                false
            }
        }
    }
}

impl Default for SystemPrivilegeProbe {
    fn default() -> Self {
        Self::new("nmap")
    }
}

#[async_trait]
impl PrivilegeProbe for SystemPrivilegeProbe {
    async fn check(&self) -> PrivilegeStatus {
        let Some(binary) = self.locate_nmap() else {
            return PrivilegeStatus::denied(format!(
                "nmap is not installed or not in PATH ({})",
                self.nmap_path.display()
            ));
        };

        match &self.platform {
            HostPlatform::Linux => {
                if Self::has_raw_socket_capabilities(&binary).await {
                    return PrivilegeStatus::granted("nmap has required capabilities");
                }
                if is_root::is_root() {
                    return PrivilegeStatus::granted("Running with root privileges");
                }
                PrivilegeStatus::denied(
                    "nmap requires elevated privileges. Run with sudo or set capabilities.",
                )
            }
            HostPlatform::MacOs => {
                if is_root::is_root() {
                    PrivilegeStatus::granted("Running with root privileges")
                } else {
                    PrivilegeStatus::denied("nmap requires elevated privileges. Run with sudo.")
                }
            }
            HostPlatform::Windows => {
                if is_root::is_root() {
                    PrivilegeStatus::granted("Running with administrator privileges")
                } else {
                    PrivilegeStatus::denied(
                        "nmap requires administrator privileges. Run as administrator.",
                    )
                }
            }
            HostPlatform::Other(name) => {
                PrivilegeStatus::denied(format!("Unsupported platform: {name}"))
            }
        }
    }

    fn instructions(&self) -> String {
        match self.platform {
            HostPlatform::Linux => "To grant nmap the required privileges on Linux:\n\n\
                 Option 1: Use capabilities (recommended):\n  \
                 sudo setcap cap_net_raw,cap_net_admin=eip $(which nmap)\n\n\
                 Option 2: Run the server with sudo:\n  \
                 sudo cyberscope-server\n\n\
                 Option 3: Run as root (not recommended for security)"
                .to_string(),
            HostPlatform::MacOs => "To run with required privileges on macOS:\n\n\
                 Run the server with sudo:\n  \
                 sudo cyberscope-server\n\n\
                 Note: macOS does not support file capabilities like Linux."
                .to_string(),
            HostPlatform::Windows => "To run with required privileges on Windows:\n\n\
                 1. Right-click the application\n\
                 2. Select \"Run as Administrator\"\n\
                 3. Click \"Yes\" on the UAC prompt\n\n\
                 Or run from an elevated command prompt/PowerShell."
                .to_string(),
            HostPlatform::Other(_) => "Platform-specific instructions not available.".to_string(),
        }
    }
}

/// Probe that always grants. Used when the operator disables the pre-flight
/// check, e.g. inside containers that already carry `CAP_NET_RAW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePrivilegeProbe;

#[async_trait]
impl PrivilegeProbe for PermissivePrivilegeProbe {
    async fn check(&self) -> PrivilegeStatus {
        PrivilegeStatus::granted("privilege check disabled by configuration")
    }

    fn instructions(&self) -> String {
        String::new()
    }
}

impl fmt::Display for PrivilegeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic)
    }
}
