// src/core/sentinel/action.rs

//! Corrective actions the reconciler and cleaner can take, and the command
//! each one becomes on the wire.

use super::pool_option::PoolOption;
use crate::core::endpoint::Endpoint;
use std::fmt;

/// A single idempotent correction. Re-applying an already satisfied action
/// leaves no observable change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start monitoring `pool` with `master` as its current master.
    CreatePool {
        pool: String,
        master: Endpoint,
        quorum: u32,
    },
    /// Set one per-pool monitor option.
    SetOption {
        pool: String,
        option: PoolOption,
        value: String,
    },
    /// Point `replica` at `master`. Sent to the replica itself, not the monitor.
    EnrollReplica {
        pool: String,
        replica: Endpoint,
        master: Endpoint,
    },
    /// Stop monitoring `pool`.
    RemovePool { pool: String },
}

impl Action {
    /// The endpoint the action's command is sent to.
    pub fn target<'a>(&'a self, monitor: &'a Endpoint) -> &'a Endpoint {
        match self {
            Action::EnrollReplica { replica, .. } => replica,
            _ => monitor,
        }
    }

    /// True for actions that change replication roles. Only the authoritative
    /// monitor ever applies these.
    pub fn mutates_roles(&self) -> bool {
        matches!(self, Action::EnrollReplica { .. })
    }

    pub fn command(&self) -> Vec<String> {
        match self {
            Action::CreatePool {
                pool,
                master,
                quorum,
            } => vec![
                "SENTINEL".into(),
                "MONITOR".into(),
                pool.clone(),
                master.host.clone(),
                master.port.to_string(),
                quorum.to_string(),
            ],
            Action::SetOption {
                pool,
                option,
                value,
            } => vec![
                "SENTINEL".into(),
                "SET".into(),
                pool.clone(),
                option.wire_name(),
                value.clone(),
            ],
            Action::EnrollReplica { master, .. } => vec![
                "REPLICAOF".into(),
                master.host.clone(),
                master.port.to_string(),
            ],
            Action::RemovePool { pool } => {
                vec!["SENTINEL".into(), "REMOVE".into(), pool.clone()]
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreatePool {
                pool,
                master,
                quorum,
            } => write!(f, "create pool {pool} with master {master} (quorum {quorum})"),
            // The value may be a secret, so it is never rendered.
            Action::SetOption { pool, option, .. } => write!(f, "set {option} on pool {pool}"),
            Action::EnrollReplica {
                pool,
                replica,
                master,
            } => write!(f, "enroll {replica} as replica of {master} in pool {pool}"),
            Action::RemovePool { pool } => write!(f, "remove pool {pool}"),
        }
    }
}
