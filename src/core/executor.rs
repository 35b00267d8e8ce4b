// src/core/executor.rs

//! The capability every reconciliation stage talks to endpoints through, and
//! its TCP implementation speaking RESP2 to monitors and store instances.

use crate::core::endpoint::Endpoint;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use crate::core::WardenError;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues one command against one endpoint.
///
/// Implementations must map transport failures to `WardenError::Unreachable`
/// and `-ERR` replies to `WardenError::CommandFailed`; every other reply is
/// returned as-is for the caller to interpret.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        auth: Option<&str>,
        args: &[String],
    ) -> Result<RespFrame, WardenError>;
}

/// Opens a fresh connection per command, authenticates when a secret is
/// given, sends the command and waits for a single reply.
#[derive(Debug, Default, Clone)]
pub struct RespExecutor;

impl RespExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn roundtrip(
        &self,
        endpoint: &Endpoint,
        auth: Option<&str>,
        args: &[String],
    ) -> Result<RespFrame> {
        let addr = endpoint.to_string();
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| anyhow!("connect timed out"))?
            .with_context(|| format!("connect to {addr}"))?;
        let mut framed = Framed::new(stream, RespFrameCodec);

        if let Some(secret) = auth.filter(|s| !s.is_empty()) {
            let reply = send_and_receive(&mut framed, RespFrame::command(&["AUTH", secret])).await?;
            if let RespFrame::Error(msg) = reply {
                return Ok(RespFrame::Error(msg));
            }
        }

        send_and_receive(&mut framed, RespFrame::command(args)).await
    }
}

async fn send_and_receive(
    framed: &mut Framed<TcpStream, RespFrameCodec>,
    frame: RespFrame,
) -> Result<RespFrame> {
    framed.send(frame).await.context("write command")?;
    match tokio::time::timeout(READ_TIMEOUT, framed.next()).await {
        Ok(Some(Ok(reply))) => Ok(reply),
        Ok(Some(Err(e))) => Err(anyhow!(e).context("read reply")),
        Ok(None) => Err(anyhow!("connection closed by peer")),
        Err(_) => Err(anyhow!("read timeout while waiting for response")),
    }
}

#[async_trait]
impl CommandExecutor for RespExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        auth: Option<&str>,
        args: &[String],
    ) -> Result<RespFrame, WardenError> {
        // Only the verb: arguments may carry pool secrets.
        debug!("{} <- {}", endpoint, args[..args.len().min(2)].join(" "));
        match self.roundtrip(endpoint, auth, args).await {
            Ok(RespFrame::Error(message)) => Err(WardenError::CommandFailed {
                endpoint: endpoint.to_string(),
                message,
            }),
            Ok(reply) => Ok(reply),
            Err(e) => Err(WardenError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: format!("{e:#}"),
            }),
        }
    }
}

/// Turns a `&[&str]` argument list into the owned form `execute` takes.
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}
