// src/core/sentinel/reconciler.rs

//! Brings one pool on one monitor in line with its declaration.

use super::action::Action;
use super::authority::{authoritative, is_authoritative};
use super::live::{LivePoolFacts, LiveStateReader};
use super::pool_option::PoolOption;
use super::{Mode, Report, apply_action};
use crate::config::DesiredPool;
use crate::core::endpoint::Endpoint;
use crate::core::executor::CommandExecutor;
use crate::core::WardenError;
use tracing::{debug, info, warn};

/// Runs presence, option and replica reconciliation for a single pool, in
/// that order. In check mode the first difference ends the run.
pub struct PoolReconciler<'a> {
    executor: &'a dyn CommandExecutor,
    reader: LiveStateReader<'a>,
    monitor: Endpoint,
    monitors: &'a [Endpoint],
    pool: &'a DesiredPool,
    mode: Mode,
}

impl<'a> PoolReconciler<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        monitor: Endpoint,
        monitors: &'a [Endpoint],
        pool: &'a DesiredPool,
        mode: Mode,
    ) -> Self {
        Self {
            executor,
            reader: LiveStateReader::new(executor),
            monitor,
            monitors,
            pool,
            mode,
        }
    }

    pub async fn run(&self) -> Result<Report, WardenError> {
        let mut report = Report::default();
        let authority = is_authoritative(self.monitors, &self.monitor);
        debug!(
            "Reconciling pool '{}' on {} ({:?}, authoritative: {})",
            self.pool.name, self.monitor, self.mode, authority
        );

        let facts = self.ensure_present(authority, &mut report).await?;
        // Options go first: enrolling replicas may depend on a current auth-pass.
        self.reconcile_options(&facts, &mut report).await?;
        if authority {
            self.reconcile_replicas(&mut report).await?;
        }
        Ok(report)
    }

    async fn ensure_present(
        &self,
        authority: bool,
        report: &mut Report,
    ) -> Result<LivePoolFacts, WardenError> {
        let name = &self.pool.name;
        if let Some(facts) = self.reader.get_pool_facts(&self.monitor, name).await? {
            return Ok(facts);
        }
        if self.mode == Mode::Check {
            return Err(self.drift(format!("pool {name} is missing")));
        }

        // Declared order only picks the master of a pool nobody monitors yet.
        let master = if authority {
            self.pool.initial_master().clone()
        } else {
            self.reader
                .get_master(authoritative(self.monitors)?, name)
                .await?
        };
        if !self.reader.ping(&master, self.pool.auth()).await? {
            return Err(WardenError::Unreachable {
                endpoint: master.to_string(),
                reason: "master candidate did not answer PING".into(),
            });
        }

        let action = Action::CreatePool {
            pool: name.clone(),
            master,
            quorum: self.pool.quorum,
        };
        self.apply(action, report).await?;

        self.reader
            .get_pool_facts(&self.monitor, name)
            .await?
            .ok_or_else(|| WardenError::CommandFailed {
                endpoint: self.monitor.to_string(),
                message: format!("pool {name} still missing after MONITOR"),
            })
    }

    async fn reconcile_options(
        &self,
        facts: &LivePoolFacts,
        report: &mut Report,
    ) -> Result<(), WardenError> {
        for option in PoolOption::DIFFED {
            // Undeclared tunables are left to the monitor's defaults.
            let Some(declared) = self.pool.declared(option) else {
                continue;
            };
            let live = facts.option(&option.wire_name());
            let satisfied = match live {
                Some(value) => value == declared,
                // Unset on both sides.
                None => declared.is_empty(),
            };
            if satisfied {
                continue;
            }
            if self.mode == Mode::Check {
                return Err(self.drift(format!(
                    "option {} has wrong value {}",
                    option,
                    live.unwrap_or("<unset>")
                )));
            }
            let action = Action::SetOption {
                pool: self.pool.name.clone(),
                option,
                value: declared,
            };
            self.apply(action, report).await?;
        }

        // Secrets are write-only: re-assert on every fix run instead of diffing.
        if self.mode == Mode::Fix {
            let action = Action::SetOption {
                pool: self.pool.name.clone(),
                option: PoolOption::AuthPass,
                value: self.pool.auth_pass.clone(),
            };
            self.apply(action, report).await?;
        }
        Ok(())
    }

    async fn reconcile_replicas(&self, report: &mut Report) -> Result<(), WardenError> {
        let name = &self.pool.name;
        // Always the live master: a failover may have promoted another member.
        let master = self
            .reader
            .get_master(authoritative(self.monitors)?, name)
            .await?;
        let replicas = self.reader.get_replicas(&self.monitor, name).await?;

        for member in &self.pool.members {
            if *member == master || replicas.contains(member) {
                continue;
            }
            if self.mode == Mode::Check {
                return Err(self.drift(format!("{member} not configured as replica")));
            }
            let action = Action::EnrollReplica {
                pool: name.clone(),
                replica: member.clone(),
                master: master.clone(),
            };
            self.apply(action, report).await?;
        }
        Ok(())
    }

    /// Applies one action. Monitor-side actions are sent without credentials
    /// and any failure ends the run. Role changes go to a pool member with the
    /// pool secret; a member that is down or refuses is left for the next run.
    async fn apply(&self, action: Action, report: &mut Report) -> Result<(), WardenError> {
        let role_change = action.mutates_roles();
        let auth = if role_change { self.pool.auth() } else { None };
        match apply_action(self.executor, &self.monitor, auth, &action).await {
            Ok(()) => report.applied.push(action),
            Err(e @ (WardenError::Unreachable { .. } | WardenError::CommandFailed { .. }))
                if role_change =>
            {
                warn!("Could not {}: {}. Leaving it for the next run.", action, e);
                report.tolerated.push((action, e));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn drift(&self, reason: String) -> WardenError {
        info!("Pool '{}' on {}: {}", self.pool.name, self.monitor, reason);
        WardenError::Drift(reason)
    }
}
