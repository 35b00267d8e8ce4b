// src/core/mod.rs

//! The reconciliation engine: endpoint transport, live state reading and the
//! decision logic for pools, orphans and store options.

pub mod endpoint;
pub mod errors;
pub mod executor;
pub mod protocol;
pub mod sentinel;
pub mod store;

pub use endpoint::Endpoint;
pub use errors::WardenError;
