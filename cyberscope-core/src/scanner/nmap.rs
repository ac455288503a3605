use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{RawReport, ScanProfile, ScannerInvoker};
use crate::error::{Result, ScanError};

const XML_TO_STDOUT: [&str; 2] = ["-oX", "-"];

/// Invokes the `nmap` binary as a child process.
#[derive(Debug, Clone)]
pub struct NmapInvoker {
    binary: PathBuf,
}

impl NmapInvoker {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, target: &str, profile: &ScanProfile) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(profile.arguments())
            .args(XML_TO_STDOUT)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for NmapInvoker {
    fn default() -> Self {
        Self::new("nmap")
    }
}

#[async_trait]
impl ScannerInvoker for NmapInvoker {
    async fn invoke(
        &self,
        target: &str,
        profile: &ScanProfile,
        timeout: Duration,
    ) -> Result<RawReport> {
        if target.starts_with('-') {
            return Err(ScanError::ToolInvocation(format!(
                "refusing option-like target {target:?}"
            )));
        }

        debug!(
            binary = %self.binary.display(),
            scan_target = target,
            arguments = %profile.scan_type.argument_line(),
            "spawning nmap"
        );

        let started = Instant::now();
        let output = match tokio::time::timeout(timeout, self.command(target, profile).output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(ScanError::ToolInvocation(format!(
                    "failed to run {}: {err}",
                    self.binary.display()
                )));
            }
            Err(_) => {
                warn!(scan_target = target, timeout_secs = timeout.as_secs(), "nmap timed out");
                return Err(ScanError::Timeout(timeout));
            }
        };

        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let detail = if diagnostics.is_empty() {
                output.status.to_string()
            } else {
                diagnostics
            };
            return Err(ScanError::ToolInvocation(format!("nmap exited unsuccessfully: {detail}")));
        }

        let xml = String::from_utf8(output.stdout)
            .map_err(|err| ScanError::ToolInvocation(format!("nmap output is not UTF-8: {err}")))?;
        if xml.trim().is_empty() {
            return Err(ScanError::ToolInvocation("nmap produced no output".into()));
        }

        Ok(RawReport {
            xml,
            diagnostics,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberscope_model::ScanType;

    #[tokio::test]
    async fn missing_binary_is_a_tool_error() {
        let invoker = NmapInvoker::new("/nonexistent/bin/nmap");
        let err = invoker
            .invoke(
                "127.0.0.1",
                &ScanProfile::new(ScanType::Quick),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ToolInvocation(_)));
    }

    #[tokio::test]
    async fn option_like_targets_never_reach_the_process() {
        let invoker = NmapInvoker::default();
        let err = invoker
            .invoke(
                "--script=vuln",
                &ScanProfile::new(ScanType::Basic),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ToolInvocation(msg) if msg.contains("option-like")));
    }

    #[test]
    fn command_appends_xml_output_and_target_last() {
        let invoker = NmapInvoker::new("nmap");
        let command = invoker.command("10.0.0.1", &ScanProfile::new(ScanType::Basic));
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            ["-sV", "-T4", "--top-ports", "1000", "-oX", "-", "10.0.0.1"]
        );
    }
}
