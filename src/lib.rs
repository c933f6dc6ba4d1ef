//! Black-box leader election and failover verification.
//!
//! Server instances run as child processes. Their leadership and readiness are
//! inferred only from their console output, and their HTTP surface serves as
//! a functional oracle. A [`ScenarioDriver`] kills the elected leader again
//! and again and checks that every replacement holds a strictly higher term.

mod client;
mod cluster;
mod config;
pub mod constants;
mod detector;
mod errors;
mod instance;
mod launcher;
mod oracle;
mod scenario;
mod timing;
pub mod utils;

pub use client::*;
pub use cluster::*;
pub use crate::config::*;
pub use detector::*;
pub use errors::*;
pub use instance::*;
pub use launcher::*;
pub use oracle::*;
pub use scenario::*;
pub use timing::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
