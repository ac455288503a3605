//! Scan orchestration engine for CyberScope.
//!
//! The engine validates targets, tracks scan sessions through
//! `pending -> running -> completed | failed`, runs nmap in background tasks,
//! and normalizes its XML reports into findings. Storage, the scanner, and the
//! host privilege check are injected through the traits in [`persistence`],
//! [`scanner`], and [`privilege`].
//!
//! ## Feature Flags
//!
//! - `postgres`: Enables [`PostgresStore`](persistence::PostgresStore) and the bundled migrations
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cyberscope_core::{
//!     DispatcherConfig, NmapInvoker, ScanEngine, SystemPrivilegeProbe, model::ScanType,
//! };
//!
//! # async fn run() -> cyberscope_core::Result<()> {
//! let engine = ScanEngine::in_memory(
//!     Arc::new(NmapInvoker::default()),
//!     Arc::new(SystemPrivilegeProbe::default()),
//!     DispatcherConfig::default(),
//! );
//! let submitted = engine.submit_scan("192.168.1.1", ScanType::Quick).await?;
//! let snapshot = engine.get_session(submitted.session.id).await?;
//! println!("{} is {}", snapshot.id, snapshot.status);
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod engine;
pub mod error;
pub mod orchestration;
pub mod persistence;
pub mod privilege;
pub mod report;
pub mod scanner;
pub mod session;
pub mod target;

pub use cyberscope_model as model;

pub use engine::{RECENT_SESSIONS_LIMIT, RegisteredTarget, ScanEngine, SubmittedScan};
pub use error::{Result, ScanError};
pub use orchestration::{DispatcherConfig, LaunchOutcome, ScanDispatcher, ScanHandle};
pub use persistence::{InMemoryStore, SessionStore, SessionTransaction, TargetStore};
#[cfg(feature = "postgres")]
pub use persistence::{MIGRATOR, PostgresStore};
pub use privilege::{PermissivePrivilegeProbe, PrivilegeProbe, PrivilegeStatus, SystemPrivilegeProbe};
pub use report::{ScanReport, parse_report, project_findings};
pub use scanner::{NmapInvoker, RawReport, ScanProfile, ScannerInvoker};
pub use session::{ScanSessionMachine, Transition};
pub use target::{PUBLIC_TARGET_WARNING, TargetValidation, validate_target};
