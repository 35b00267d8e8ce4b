// src/core/sentinel/live.rs

//! Reads live topology facts from monitors and store instances.

use crate::core::endpoint::Endpoint;
use crate::core::executor::{CommandExecutor, args};
use crate::core::protocol::RespFrame;
use crate::core::WardenError;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// What a monitor currently knows about one pool.
///
/// The replica set is not part of this snapshot. Only the authoritative
/// monitor acts on replicas, so it is read on demand with
/// [`LiveStateReader::get_replicas`] and followers never issue that query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePoolFacts {
    pub name: String,
    pub master: Endpoint,
    /// Every field of the monitor's report keyed by wire name,
    /// e.g. `down-after-milliseconds`.
    pub options: IndexMap<String, String>,
}

impl LivePoolFacts {
    pub fn option(&self, wire_name: &str) -> Option<&str> {
        self.options.get(wire_name).map(String::as_str)
    }
}

/// Translates monitor and store replies into facts. Every query is issued
/// exactly once; a failure is reported to the caller, never retried.
pub struct LiveStateReader<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> LiveStateReader<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// The current master of `pool` according to `monitor`.
    pub async fn get_master(&self, monitor: &Endpoint, pool: &str) -> Result<Endpoint, WardenError> {
        let reply = self
            .executor
            .execute(
                monitor,
                None,
                &args(&["SENTINEL", "GET-MASTER-ADDR-BY-NAME", pool]),
            )
            .await;
        let reply = match reply {
            Err(e) if e.is_unknown_master() => {
                return Err(WardenError::MasterNotFound { pool: pool.into() });
            }
            other => other?,
        };
        if reply.is_null() {
            return Err(WardenError::MasterNotFound { pool: pool.into() });
        }
        let RespFrame::Array(parts) = &reply else {
            return Err(unexpected(monitor, &reply));
        };
        match (
            parts.first().and_then(RespFrame::as_text),
            parts.get(1).and_then(RespFrame::as_text),
        ) {
            (Some(ip), Some(port)) => format!("{ip}:{port}")
                .parse()
                .map_err(|_| unexpected(monitor, &reply)),
            _ => Err(unexpected(monitor, &reply)),
        }
    }

    /// The monitor's report for `pool`, or `None` when it does not monitor
    /// a pool by that name.
    pub async fn get_pool_facts(
        &self,
        monitor: &Endpoint,
        pool: &str,
    ) -> Result<Option<LivePoolFacts>, WardenError> {
        let reply = match self
            .executor
            .execute(monitor, None, &args(&["SENTINEL", "MASTER", pool]))
            .await
        {
            Err(e) if e.is_unknown_master() => return Ok(None),
            other => other?,
        };
        let options = field_map(&reply).ok_or_else(|| unexpected(monitor, &reply))?;
        let master = match (options.get("ip"), options.get("port")) {
            (Some(ip), Some(port)) => format!("{ip}:{port}")
                .parse()
                .map_err(|_| unexpected(monitor, &reply))?,
            _ => return Err(unexpected(monitor, &reply)),
        };
        Ok(Some(LivePoolFacts {
            name: pool.to_string(),
            master,
            options,
        }))
    }

    /// The replicas `monitor` tracks for `pool`.
    pub async fn get_replicas(
        &self,
        monitor: &Endpoint,
        pool: &str,
    ) -> Result<BTreeSet<Endpoint>, WardenError> {
        let reply = self
            .executor
            .execute(monitor, None, &args(&["SENTINEL", "SLAVES", pool]))
            .await?;
        named_entries(&reply)
            .ok_or_else(|| unexpected(monitor, &reply))?
            .into_iter()
            .map(|name| name.parse().map_err(|_| unexpected(monitor, &reply)))
            .collect()
    }

    /// Every pool `monitor` currently supervises.
    pub async fn get_all_pool_names(
        &self,
        monitor: &Endpoint,
    ) -> Result<BTreeSet<String>, WardenError> {
        let reply = self
            .executor
            .execute(monitor, None, &args(&["SENTINEL", "MASTERS"]))
            .await?;
        let names = named_entries(&reply).ok_or_else(|| unexpected(monitor, &reply))?;
        Ok(names.into_iter().collect())
    }

    /// Liveness probe against a store instance.
    ///
    /// `Ok(false)` means the instance answered with something other than
    /// `PONG` (e.g. an authentication error); transport failures are
    /// `Unreachable`.
    pub async fn ping(&self, store: &Endpoint, auth: Option<&str>) -> Result<bool, WardenError> {
        match self.executor.execute(store, auth, &args(&["PING"])).await {
            Ok(reply) => Ok(reply
                .as_text()
                .is_some_and(|s| s.eq_ignore_ascii_case("PONG"))),
            Err(WardenError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Reads a flat `[field, value, field, value, ...]` reply into a map.
fn field_map(frame: &RespFrame) -> Option<IndexMap<String, String>> {
    let RespFrame::Array(items) = frame else {
        return None;
    };
    if items.len() % 2 != 0 {
        return None;
    }
    items
        .chunks_exact(2)
        .map(|pair| Some((pair[0].as_text()?, pair[1].as_text()?)))
        .collect()
}

/// Collects the `name` field of every entry in a list of field maps, as
/// returned by `SENTINEL MASTERS` and `SENTINEL SLAVES`.
fn named_entries(frame: &RespFrame) -> Option<Vec<String>> {
    let RespFrame::Array(entries) = frame else {
        return None;
    };
    entries
        .iter()
        .map(|entry| field_map(entry)?.get("name").cloned())
        .collect()
}

fn unexpected(endpoint: &Endpoint, reply: &RespFrame) -> WardenError {
    WardenError::UnexpectedReply {
        endpoint: endpoint.to_string(),
        detail: format!("{reply:?}"),
    }
}
