//! news-agent library
//!
//! Exposes the cache, retry, ranking and fetch layers used by the binary, for
//! use in integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod digest;
pub mod fetch;
pub mod ranking;
pub mod retry;
pub mod sources;
