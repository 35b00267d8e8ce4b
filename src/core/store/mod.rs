// src/core/store/mod.rs

//! Direct management of store instance configuration.

pub mod options;
pub mod setter;
