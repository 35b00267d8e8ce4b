// src/core/endpoint.rs

use crate::core::WardenError;
use std::fmt;
use std::str::FromStr;

/// A `host:port` pair naming a monitor or a store instance.
///
/// Hosts are kept as written: `10.0.0.1` and `node-a` are different endpoints
/// even if they resolve to the same machine, matching how monitors report
/// addresses back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a comma separated endpoint list, skipping blank entries.
    pub fn parse_list(list: &str) -> Result<Vec<Endpoint>, WardenError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| WardenError::InvalidValue(format!("'{s}' is not host:port")))?;
        if host.is_empty() {
            return Err(WardenError::InvalidValue(format!("'{s}' has an empty host")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| WardenError::InvalidValue(format!("'{s}' has an invalid port")))?;
        Ok(Endpoint::new(host, port))
    }
}
