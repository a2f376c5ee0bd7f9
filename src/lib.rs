//! Edge evaluation, fractional-Kelly sizing and bankroll allocation for
//! binary-outcome contracts.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod batch;
pub mod config;
pub mod error;
pub mod market;
pub mod monitoring;
pub mod risk;

pub use error::{EngineError, Result};
