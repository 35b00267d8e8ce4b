// src/core/sentinel/cleaner.rs

//! Finds pools a monitor supervises that the desired state no longer declares.

use super::action::Action;
use super::live::LiveStateReader;
use super::{Mode, Report, apply_action};
use crate::core::endpoint::Endpoint;
use crate::core::executor::CommandExecutor;
use crate::core::WardenError;
use std::collections::BTreeSet;
use tracing::info;

/// Pools known live but not declared.
pub fn orphan_names(live: &BTreeSet<String>, declared: &BTreeSet<String>) -> BTreeSet<String> {
    live.difference(declared).cloned().collect()
}

/// Monitor-local orphan removal. Orphans are independent of each other, so
/// they are removed in whatever order the set yields them.
pub struct FleetCleaner<'a> {
    executor: &'a dyn CommandExecutor,
    monitor: Endpoint,
    mode: Mode,
}

impl<'a> FleetCleaner<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, monitor: Endpoint, mode: Mode) -> Self {
        Self {
            executor,
            monitor,
            mode,
        }
    }

    pub async fn orphans(&self, declared: &BTreeSet<String>) -> Result<BTreeSet<String>, WardenError> {
        let live = LiveStateReader::new(self.executor)
            .get_all_pool_names(&self.monitor)
            .await?;
        Ok(orphan_names(&live, declared))
    }

    pub async fn run(&self, declared: &BTreeSet<String>) -> Result<Report, WardenError> {
        let orphans = self.orphans(declared).await?;
        let mut report = Report::default();
        if orphans.is_empty() {
            return Ok(report);
        }

        if self.mode == Mode::Check {
            let list = orphans.iter().cloned().collect::<Vec<_>>().join(", ");
            info!("{} supervises undeclared pools: {}", self.monitor, list);
            return Err(WardenError::Drift(format!(
                "the following pools need to be removed: {list}"
            )));
        }

        for pool in orphans {
            let action = Action::RemovePool { pool };
            apply_action(self.executor, &self.monitor, None, &action).await?;
            report.applied.push(action);
        }
        Ok(report)
    }
}
