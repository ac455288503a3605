use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Scan profile requested by a client.
///
/// Every variant maps to a fixed nmap argument set. The target address is the
/// only caller-controlled token that ever reaches the scanner command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScanType {
    /// Top 1000 ports with service detection.
    #[default]
    Basic,
    /// The 100 most common ports with service detection.
    Quick,
    /// All 65535 TCP ports with service detection.
    Full,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Basic => "basic",
            ScanType::Quick => "quick",
            ScanType::Full => "full",
        }
    }

    pub fn nmap_arguments(&self) -> &'static [&'static str] {
        match self {
            ScanType::Basic => &["-sV", "-T4", "--top-ports", "1000"],
            ScanType::Quick => &["-sV", "-T4", "-F"],
            ScanType::Full => &["-sV", "-T4", "-p-"],
        }
    }

    /// Space-joined argument string recorded on the session.
    pub fn argument_line(&self) -> String {
        self.nmap_arguments().join(" ")
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ScanType::Basic),
            "quick" => Ok(ScanType::Quick),
            "full" => Ok(ScanType::Full),
            _ => Err(ModelError::UnknownScanType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_matches_default_service_scan() {
        assert_eq!(ScanType::default(), ScanType::Basic);
        assert_eq!(ScanType::Basic.argument_line(), "-sV -T4 --top-ports 1000");
    }

    #[test]
    fn parsing_is_case_insensitive_and_rejects_custom() {
        assert_eq!(" FULL ".parse::<ScanType>().unwrap(), ScanType::Full);
        assert_eq!(
            "custom".parse::<ScanType>(),
            Err(ModelError::UnknownScanType("custom".into()))
        );
    }
}
