// src/config.rs

//! Loads the desired-state document: which monitors form the fleet and how
//! every pool they supervise should be configured.
//!
//! ```toml
//! [main]
//! sentinel = "10.0.0.1:26379,10.0.0.2:26379"
//!
//! ["cache:pool"]
//! quorum = 2
//! members = "10.0.0.1:6379,10.0.0.2:6379"
//! auth_pass = "secret"
//! down_after_milliseconds = 30000
//! ```
//!
//! Any section whose name ends in `:pool` declares a pool. The `sentinel`
//! list is ordered and its first entry is the authoritative monitor.

use crate::core::endpoint::Endpoint;
use crate::core::sentinel::pool_option::PoolOption;
use crate::core::WardenError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::debug;

/// Section name suffix marking a pool declaration.
pub const POOL_SECTION_SUFFIX: &str = ":pool";

/// Default location of the desired-state document.
pub const DEFAULT_DOCUMENT_PATH: &str = "/etc/redis/sentinel_pools.toml";

/// A scalar as written in the document. Values are compared with what the
/// monitor reports, which is always text, so everything is normalised to a
/// string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

/// An endpoint list, either comma separated or as a TOML array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EndpointList {
    Joined(String),
    Items(Vec<String>),
}

impl EndpointList {
    fn parse(&self) -> Result<Vec<Endpoint>, WardenError> {
        match self {
            EndpointList::Joined(s) => Endpoint::parse_list(s),
            EndpointList::Items(items) => items
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawMain {
    sentinel: Option<EndpointList>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPool {
    quorum: Option<Scalar>,
    members: Option<EndpointList>,
    auth_pass: Option<Scalar>,
    #[serde(flatten)]
    rest: BTreeMap<String, Scalar>,
}

/// Declared intent for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredPool {
    pub name: String,
    pub quorum: u32,
    /// Never empty. The first member is the initial master candidate when
    /// the pool is not monitored yet.
    pub members: Vec<Endpoint>,
    /// Empty when the pool's instances need no authentication.
    pub auth_pass: String,
    /// Managed tunables; an undeclared tunable is absent here and never diffed.
    pub tunables: BTreeMap<PoolOption, String>,
}

impl DesiredPool {
    /// The declared value of `option`. `None` for a tunable the section does
    /// not mention: the monitor keeps whatever value it has.
    pub fn declared(&self, option: PoolOption) -> Option<String> {
        match option {
            PoolOption::Quorum => Some(self.quorum.to_string()),
            PoolOption::AuthPass => Some(self.auth_pass.clone()),
            other => self.tunables.get(&other).cloned(),
        }
    }

    /// The secret to authenticate against member instances with, if any.
    pub fn auth(&self) -> Option<&str> {
        Some(self.auth_pass.as_str()).filter(|s| !s.is_empty())
    }

    pub fn initial_master(&self) -> &Endpoint {
        &self.members[0]
    }
}

/// The loaded desired-state document. Read once per run and never mutated.
#[derive(Debug, Clone)]
pub struct DesiredState {
    monitors: Vec<Endpoint>,
    pools: BTreeMap<String, RawPool>,
}

impl DesiredState {
    /// Reads and parses the document at `path`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| WardenError::ConfigUnreadable(format!("{}: {e}", path.display())))?;
        debug!("Loaded desired state from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parses a document. Duplicate keys and duplicate sections are rejected
    /// by the TOML parser and surface as `ConfigUnreadable`.
    pub fn from_toml_str(content: &str) -> Result<Self, WardenError> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| WardenError::ConfigUnreadable(e.to_string()))?;

        let mut monitors = None;
        let mut pools = BTreeMap::new();
        for (section, value) in table {
            if section == "main" {
                let main: RawMain = value
                    .try_into()
                    .map_err(|e| WardenError::ConfigUnreadable(format!("[main]: {e}")))?;
                monitors = main.sentinel;
            } else if let Some(name) = section.strip_suffix(POOL_SECTION_SUFFIX) {
                let pool: RawPool = value.try_into().map_err(|e| {
                    WardenError::ConfigUnreadable(format!("[{section}]: {e}"))
                })?;
                pools.insert(name.to_string(), pool);
            }
        }

        let monitors = monitors
            .ok_or_else(|| WardenError::ConfigUnreadable("no sentinel list in [main]".into()))?
            .parse()
            .map_err(|e| WardenError::ConfigUnreadable(format!("[main] sentinel: {e}")))?;
        if monitors.is_empty() {
            return Err(WardenError::ConfigUnreadable(
                "[main] sentinel list is empty".into(),
            ));
        }

        Ok(Self { monitors, pools })
    }

    /// The ordered monitor fleet. Index 0 is the authoritative monitor.
    pub fn monitor_endpoints(&self) -> &[Endpoint] {
        &self.monitors
    }

    pub fn pool_names(&self) -> BTreeSet<String> {
        self.pools.keys().cloned().collect()
    }

    /// The validated declaration of one pool.
    pub fn pool(&self, name: &str) -> Result<DesiredPool, WardenError> {
        let raw = self
            .pools
            .get(name)
            .ok_or_else(|| WardenError::ConfigInvalid(format!("no section [{name}:pool]")))?;
        let invalid = |msg: String| WardenError::ConfigInvalid(format!("[{name}:pool] {msg}"));

        let quorum = raw
            .quorum
            .clone()
            .ok_or_else(|| invalid("has no quorum".into()))?
            .into_text();
        let quorum = quorum
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| invalid(format!("quorum '{quorum}' is not a positive integer")))?;

        let members = raw
            .members
            .as_ref()
            .ok_or_else(|| invalid("has no members".into()))?
            .parse()
            .map_err(|e| invalid(format!("members: {e}")))?;
        if members.is_empty() {
            return Err(invalid("has an empty member list".into()));
        }

        let mut tunables = BTreeMap::new();
        for (key, value) in &raw.rest {
            let option = PoolOption::from_str(key)
                .ok()
                .filter(|o| PoolOption::TUNABLES.contains(o))
                .ok_or_else(|| invalid(format!("unknown option {key}")))?;
            tunables.insert(option, value.clone().into_text());
        }

        Ok(DesiredPool {
            name: name.to_string(),
            quorum,
            members,
            auth_pass: raw
                .auth_pass
                .clone()
                .map(Scalar::into_text)
                .unwrap_or_default(),
            tunables,
        })
    }
}
