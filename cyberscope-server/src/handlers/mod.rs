pub mod findings;
pub mod health;
pub mod scans;
pub mod targets;
