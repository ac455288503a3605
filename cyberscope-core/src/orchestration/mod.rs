//! Launching and supervising scan executions.

mod dispatcher;
mod registry;

pub use dispatcher::{
    DispatcherConfig, LaunchOutcome, PROGRESS_PARSED, PROGRESS_SCANNED, PROGRESS_STARTED,
    ScanDispatcher, ScanHandle,
};
pub use registry::{InFlightClaim, InFlightRegistry, InFlightScan};
