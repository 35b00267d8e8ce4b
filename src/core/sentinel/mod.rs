// src/core/sentinel/mod.rs

//! Topology reconciliation against a fleet of Sentinel monitors.
//!
//! A run is stateless and strictly sequential:
//! - the desired state is loaded once,
//! - live facts are read from the monitor this run is bound to,
//! - each difference is either reported (check mode) or corrected (fix mode),
//! - replica roles are only ever changed by the authoritative monitor.
//!
//! There is no retry anywhere in here. Every action is idempotent, so running
//! the tool again is how a failed or interrupted run is recovered.

use crate::config::DesiredState;
use crate::core::endpoint::Endpoint;
use crate::core::executor::CommandExecutor;
use crate::core::WardenError;
use tracing::{debug, info};

pub mod action;
pub mod authority;
pub mod cleaner;
pub mod live;
pub mod pool_option;
pub mod reconciler;

use self::action::Action;
use self::cleaner::FleetCleaner;
use self::reconciler::PoolReconciler;

/// Whether a run may change live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report the first difference found and stop.
    Check,
    /// Correct every difference found.
    Fix,
}

/// What a successful run did.
#[derive(Debug, Default)]
pub struct Report {
    /// Actions applied, in order.
    pub applied: Vec<Action>,
    /// Best-effort actions that failed and were left for the next run.
    pub tolerated: Vec<(Action, WardenError)>,
}

impl Report {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.tolerated.is_empty()
    }
}

/// Sends `action` to its target and requires an `OK` reply.
pub(crate) async fn apply_action(
    executor: &dyn CommandExecutor,
    monitor: &Endpoint,
    auth: Option<&str>,
    action: &Action,
) -> Result<(), WardenError> {
    let target = action.target(monitor);
    debug!("Applying: {}", action);
    let reply = executor.execute(target, auth, &action.command()).await?;
    if !reply.is_ok() {
        return Err(WardenError::CommandFailed {
            endpoint: target.to_string(),
            message: format!("{action} answered {reply:?}"),
        });
    }
    info!("{}", action);
    Ok(())
}

/// Reconciles one declared pool on the monitor at `self_endpoint`.
pub async fn reconcile_pool(
    executor: &dyn CommandExecutor,
    state: &DesiredState,
    self_endpoint: &Endpoint,
    pool: &str,
    mode: Mode,
) -> Result<Report, WardenError> {
    let desired = state.pool(pool)?;
    PoolReconciler::new(
        executor,
        self_endpoint.clone(),
        state.monitor_endpoints(),
        &desired,
        mode,
    )
    .run()
    .await
}

/// Removes (or reports) every pool the monitor supervises that is not declared.
pub async fn clean_fleet(
    executor: &dyn CommandExecutor,
    state: &DesiredState,
    self_endpoint: &Endpoint,
    mode: Mode,
) -> Result<Report, WardenError> {
    FleetCleaner::new(executor, self_endpoint.clone(), mode)
        .run(&state.pool_names())
        .await
}
