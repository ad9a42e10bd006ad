//! HTTP API module.
//!
//! This module provides the HTTP server, its response types and the log
//! broadcaster every pipeline stage reports through.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
