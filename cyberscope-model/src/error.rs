use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownScanType(String),
    UnknownStatus(String),
    UnknownSeverity(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownScanType(raw) => {
                write!(f, "unknown scan type: {raw}")
            }
            ModelError::UnknownStatus(raw) => {
                write!(f, "unknown scan status: {raw}")
            }
            ModelError::UnknownSeverity(raw) => {
                write!(f, "unknown severity: {raw}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
