// src/core/sentinel/pool_option.rs

use strum_macros::{AsRefStr, Display, EnumString};

/// A per-pool monitor setting the desired-state document may declare.
///
/// The string form is the document key (`down_after_milliseconds`); the
/// monitor spells the same setting with hyphens, see [`PoolOption::wire_name`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum PoolOption {
    Quorum,
    DownAfterMilliseconds,
    ParallelSyncs,
    FailoverTimeout,
    NotificationScript,
    ClientReconfigScript,
    AuthPass,
}

impl PoolOption {
    /// Options compared against live state, in the order they are reconciled.
    /// `AuthPass` is deliberately absent: monitors do not echo secrets back.
    pub const DIFFED: [PoolOption; 6] = [
        PoolOption::Quorum,
        PoolOption::DownAfterMilliseconds,
        PoolOption::ParallelSyncs,
        PoolOption::FailoverTimeout,
        PoolOption::NotificationScript,
        PoolOption::ClientReconfigScript,
    ];

    /// Tunables a pool section may carry besides `quorum`, `members` and `auth_pass`.
    pub const TUNABLES: [PoolOption; 5] = [
        PoolOption::DownAfterMilliseconds,
        PoolOption::ParallelSyncs,
        PoolOption::FailoverTimeout,
        PoolOption::NotificationScript,
        PoolOption::ClientReconfigScript,
    ];

    /// The name used in `SENTINEL SET` and reported by `SENTINEL MASTER`.
    pub fn wire_name(&self) -> String {
        self.as_ref().replace('_', "-")
    }
}
