// src/core/sentinel/authority.rs

//! The single-writer rule for replication roles.
//!
//! Every monitor in the fleet runs the same reconciliation independently.
//! Options and pool presence converge no matter who writes them, but two
//! monitors issuing `REPLICAOF` at once can fight each other, so only the
//! first declared monitor touches replica topology.

use crate::core::endpoint::Endpoint;
use crate::core::WardenError;

/// True iff `self_endpoint` is the first declared monitor.
pub fn is_authoritative(monitors: &[Endpoint], self_endpoint: &Endpoint) -> bool {
    monitors.first() == Some(self_endpoint)
}

/// The monitor whose answers are authoritative for master lookups.
pub fn authoritative(monitors: &[Endpoint]) -> Result<&Endpoint, WardenError> {
    monitors
        .first()
        .ok_or_else(|| WardenError::ConfigUnreadable("no sentinel declared".into()))
}
