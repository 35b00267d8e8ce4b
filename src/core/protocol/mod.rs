// src/core/protocol/mod.rs

pub mod resp_frame;
pub use resp_frame::{FrameError, RespFrame, RespFrameCodec};
