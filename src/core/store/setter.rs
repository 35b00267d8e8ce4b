// src/core/store/setter.rs

//! Checks or sets a single store configuration option through `CONFIG`.
//!
//! Unlike pool reconciliation this is a plain read-compare-write against one
//! store instance; there is no authority rule and no ordering.

use super::options::{lookup, normalize};
use crate::core::endpoint::Endpoint;
use crate::core::executor::{CommandExecutor, args};
use crate::core::protocol::RespFrame;
use crate::core::WardenError;
use tracing::info;

pub struct ConfigSetter<'a> {
    executor: &'a dyn CommandExecutor,
    store: Endpoint,
    auth: Option<String>,
}

impl<'a> ConfigSetter<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, store: Endpoint, auth: Option<String>) -> Self {
        Self {
            executor,
            store,
            auth: auth.filter(|a| !a.is_empty()),
        }
    }

    /// The value the store currently reports for `option`.
    pub async fn current(&self, option: &str) -> Result<Option<String>, WardenError> {
        let reply = self
            .executor
            .execute(&self.store, self.auth.as_deref(), &args(&["CONFIG", "GET", option]))
            .await?;
        match &reply {
            RespFrame::Array(items) if items.is_empty() => Ok(None),
            RespFrame::Array(items) if items.len() == 2 => Ok(items[1].as_text()),
            _ => Err(WardenError::UnexpectedReply {
                endpoint: self.store.to_string(),
                detail: format!("{reply:?}"),
            }),
        }
    }

    /// Fails with `Drift` when the store's value differs from `value`.
    pub async fn check(&self, option: &str, value: &str) -> Result<(), WardenError> {
        let expected = normalize(lookup(option)?, value)?;
        let current = self.current(option).await?;
        if current.as_deref() == Some(expected.as_str()) {
            return Ok(());
        }
        Err(WardenError::Drift(format!(
            "option {option} has wrong value {}",
            current.as_deref().unwrap_or("<unset>")
        )))
    }

    /// Sets `option` and persists the running configuration with `CONFIG REWRITE`.
    pub async fn set(&self, option: &str, value: &str) -> Result<(), WardenError> {
        let value = normalize(lookup(option)?, value)?;
        self.expect_ok(&["CONFIG", "SET", option, value.as_str()]).await?;
        self.expect_ok(&["CONFIG", "REWRITE"]).await?;
        info!("Set {} on {}", option, self.store);
        Ok(())
    }

    async fn expect_ok(&self, command: &[&str]) -> Result<(), WardenError> {
        let reply = self
            .executor
            .execute(&self.store, self.auth.as_deref(), &args(command))
            .await?;
        if reply.is_ok() {
            Ok(())
        } else {
            Err(WardenError::CommandFailed {
                endpoint: self.store.to_string(),
                message: format!("{} answered {reply:?}", command[..2].join(" ")),
            })
        }
    }
}
