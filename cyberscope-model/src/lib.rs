//! Core data model definitions shared across CyberScope crates.
//!
//! The scan engine (`cyberscope-core`) and the HTTP surface
//! (`cyberscope-server`) exchange these types; nothing in here performs I/O.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod finding;
pub mod ids;
pub mod scan_type;
pub mod session;
pub mod target;

pub use error::{ModelError, Result as ModelResult};
pub use finding::{Finding, NewFinding, Severity};
pub use ids::{FindingId, SessionId, TargetId};
pub use scan_type::ScanType;
pub use session::{ScanSession, ScanStatus};
pub use target::Target;
