// src/core/errors.rs

//! Defines the error type shared by every reconciliation stage and the
//! process exit status each failure maps to.

use thiserror::Error;

/// Exit status for a clean run (no drift, every action applied).
pub const EXIT_OK: u8 = 0;
/// Exit status for detected drift or a failed action.
pub const EXIT_DRIFT: u8 = 1;
/// Exit status for a request the tool cannot serve.
pub const EXIT_INVALID: u8 = 2;
/// Exit status when the desired-state document cannot be loaded at all.
pub const EXIT_CONFIG_UNREADABLE: u8 = 255;

/// All failures a reconciliation run can end with.
///
/// Structural errors (`ConfigUnreadable`, `ConfigInvalid`) are raised before
/// any endpoint is contacted. Endpoint errors carry the `host:port` they
/// concern so the operator can tell which monitor or store misbehaved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WardenError {
    #[error("could not read config: {0}")]
    ConfigUnreadable(String),

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("could not reach {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("could not get master for pool {pool} from the first sentinel")]
    MasterNotFound { pool: String },

    #[error("{endpoint} refused the request: {message}")]
    CommandFailed { endpoint: String, message: String },

    #[error("unexpected reply from {endpoint}: {detail}")]
    UnexpectedReply { endpoint: String, detail: String },

    #[error("unsupported option {0}")]
    UnsupportedOption(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Live state differs from the declaration while running in check mode.
    #[error("{0}")]
    Drift(String),
}

impl WardenError {
    /// The process exit status operators rely on to tell failure classes apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            WardenError::ConfigUnreadable(_) => EXIT_CONFIG_UNREADABLE,
            WardenError::ConfigInvalid(_)
            | WardenError::UnsupportedOption(_)
            | WardenError::InvalidValue(_) => EXIT_INVALID,
            WardenError::Unreachable { .. }
            | WardenError::MasterNotFound { .. }
            | WardenError::CommandFailed { .. }
            | WardenError::UnexpectedReply { .. }
            | WardenError::Drift(_) => EXIT_DRIFT,
        }
    }

    /// True when the error is the monitor's "no such master" answer.
    pub fn is_unknown_master(&self) -> bool {
        matches!(
            self,
            WardenError::CommandFailed { message, .. }
                if message.contains("No such master with that name")
        )
    }
}
