// src/core/store/options.rs

//! The store configuration options the config setter is allowed to manage,
//! and size-unit handling for the ones expressed in bytes.

use crate::core::WardenError;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How an option's value is written before it is sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Sent exactly as given.
    Plain,
    /// A byte count that may carry a `k`/`kb`/`m`/`mb`/`g`/`gb` suffix.
    SizeUnit,
}

const PLAIN_OPTIONS: &[&str] = &[
    "activerehashing",
    "appendfilename",
    "appendfsync",
    "appendonly",
    "aof-rewrite-incremental-fsync",
    "aof-load-truncated",
    "auto-aof-rewrite-percentage",
    "client-output-buffer-limit",
    "cluster-migration-barrier",
    "cluster-node-timeout",
    "cluster-require-full-coverage",
    "cluster-slave-validity-factor",
    "dbfilename",
    "hash-max-ziplist-entries",
    "hash-max-ziplist-value",
    "hll-sparse-max-bytes",
    "hz",
    "latency-monitor-threshold",
    "list-compress-depth",
    "list-max-ziplist-size",
    "loglevel",
    "lua-time-limit",
    "masterauth",
    "maxclients",
    "maxmemory-policy",
    "maxmemory-samples",
    "min-slaves-max-lag",
    "min-slaves-to-write",
    "notify-keyspace-events",
    "no-appendfsync-on-rewrite",
    "rdbcompression",
    "rdbchecksum",
    "repl-diskless-sync",
    "repl-diskless-sync-delay",
    "repl-ping-slave-period",
    "repl-timeout",
    "repl-disable-tcp-nodelay",
    "repl-backlog-ttl",
    "requirepass",
    "save",
    "set-max-intset-entries",
    "slave-announce-ip",
    "slave-announce-port",
    "slave-serve-stale-data",
    "slave-read-only",
    "slave-priority",
    "slowlog-log-slower-than",
    "slowlog-max-len",
    "stop-writes-on-bgsave-error",
    "timeout",
    "tcp-keepalive",
    "zset-max-ziplist-entries",
    "zset-max-ziplist-value",
];

const SIZE_UNIT_OPTIONS: &[&str] = &["auto-aof-rewrite-min-size", "maxmemory", "repl-backlog-size"];

static OPTION_TABLE: Lazy<HashMap<&'static str, ValueKind>> = Lazy::new(|| {
    PLAIN_OPTIONS
        .iter()
        .map(|name| (*name, ValueKind::Plain))
        .chain(SIZE_UNIT_OPTIONS.iter().map(|name| (*name, ValueKind::SizeUnit)))
        .collect()
});

/// Looks up a managed option. Anything not in the table is refused.
pub fn lookup(option: &str) -> Result<ValueKind, WardenError> {
    OPTION_TABLE
        .get(option)
        .copied()
        .ok_or_else(|| WardenError::UnsupportedOption(option.to_string()))
}

// Two-letter suffixes come first so `kb` is never read as `k`.
const SUFFIXES: &[(&str, u64)] = &[
    ("kb", 1024),
    ("mb", 1024 * 1024),
    ("gb", 1024 * 1024 * 1024),
    ("k", 1000),
    ("m", 1000 * 1000),
    ("g", 1000 * 1000 * 1000),
];

/// Splits `text` into its numeric payload and the multiplier of its unit
/// suffix, if it has one. The suffix match ignores case; the payload is
/// returned as written.
fn split_suffix(text: &str) -> Option<(&str, u64)> {
    let lower = text.to_ascii_lowercase();
    SUFFIXES.iter().find_map(|(suffix, multiplier)| {
        lower
            .ends_with(suffix)
            .then(|| (&text[..text.len() - suffix.len()], *multiplier))
    })
}

/// Converts a size such as `512mb` or `2g` to bytes.
///
/// Decimal suffixes (`k`, `m`, `g`) multiply by powers of 1000, binary ones
/// (`kb`, `mb`, `gb`) by powers of 1024. A bare number is returned as is.
pub fn parse_size_unit(text: &str) -> Result<u64, WardenError> {
    let text = text.trim();
    let (payload, multiplier) = split_suffix(text).unwrap_or((text, 1));
    let value: u64 = payload
        .trim()
        .parse()
        .map_err(|_| WardenError::InvalidValue(format!("'{text}' is not a size")))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| WardenError::InvalidValue(format!("'{text}' is too large")))
}

/// The value to send to the store for an option of `kind`. Size-unit values
/// with a recognised suffix become plain byte counts; everything else is
/// passed through untouched.
pub fn normalize(kind: ValueKind, value: &str) -> Result<String, WardenError> {
    match kind {
        ValueKind::SizeUnit if split_suffix(value.trim()).is_some() => {
            Ok(parse_size_unit(value)?.to_string())
        }
        _ => Ok(value.to_string()),
    }
}
