use chrono::{DateTime, Utc};

use crate::ids::TargetId;

/// A validated scan target. The normalized address is its natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    pub id: TargetId,
    pub address: String,
    pub hostname: Option<String>,
    /// True when the address sits in a private (non-routable) range.
    pub is_rfc1918: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    pub fn new(address: impl Into<String>, is_rfc1918: bool) -> Self {
        let now = Utc::now();
        Self {
            id: TargetId::new(),
            address: address.into(),
            hostname: None,
            is_rfc1918,
            created_at: now,
            updated_at: now,
        }
    }
}
