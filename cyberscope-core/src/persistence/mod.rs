//! Storage ports and adapters for sessions, findings, and targets.

pub mod memory;
pub mod ports;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
pub use ports::{SessionStore, SessionTransaction, TargetStore};
#[cfg(feature = "postgres")]
pub use postgres::{MIGRATOR, PostgresStore};
