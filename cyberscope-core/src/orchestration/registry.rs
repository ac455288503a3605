use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use cyberscope_model::SessionId;
use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;

/// Bookkeeping for one live execution.
#[derive(Debug, Clone, Serialize)]
pub struct InFlightScan {
    pub session_id: SessionId,
    pub target: String,
    pub claimed_at: DateTime<Utc>,
}

/// Sessions with a live execution in this process. At most one claim per
/// session exists at a time.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    scans: Arc<DashMap<SessionId, InFlightScan>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `session_id`, or returns `None` when it is already claimed.
    pub fn claim(&self, session_id: SessionId, target: &str) -> Option<InFlightClaim> {
        match self.scans.entry(session_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(InFlightScan {
                    session_id,
                    target: target.to_string(),
                    claimed_at: Utc::now(),
                });
                Some(InFlightClaim {
                    scans: Arc::clone(&self.scans),
                    session_id,
                })
            }
        }
    }

    pub fn is_claimed(&self, session_id: &SessionId) -> bool {
        self.scans.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn snapshot(&self) -> Vec<InFlightScan> {
        self.scans.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("in_flight", &self.scans.len())
            .finish()
    }
}

/// Releases its session from the registry when dropped.
#[must_use = "dropping the claim releases the session immediately"]
pub struct InFlightClaim {
    scans: Arc<DashMap<SessionId, InFlightScan>>,
    session_id: SessionId,
}

impl InFlightClaim {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl fmt::Debug for InFlightClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightClaim")
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.scans.remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let registry = InFlightRegistry::new();
        let id = SessionId::new();

        let claim = registry.claim(id, "10.0.0.1").expect("first claim");
        assert!(registry.claim(id, "10.0.0.1").is_none());
        assert!(registry.is_claimed(&id));
        assert_eq!(registry.snapshot()[0].target, "10.0.0.1");

        drop(claim);
        assert!(registry.is_empty());
        assert!(registry.claim(id, "10.0.0.1").is_some());
    }

    #[test]
    fn claims_are_per_session() {
        let registry = InFlightRegistry::new();
        let _a = registry.claim(SessionId::new(), "a").unwrap();
        let _b = registry.claim(SessionId::new(), "b").unwrap();
        assert_eq!(registry.len(), 2);
    }
}
