//! Scan session lifecycle.

mod state_machine;

pub use state_machine::{ScanSessionMachine, Transition, GENERIC_FAILURE_MESSAGE};
