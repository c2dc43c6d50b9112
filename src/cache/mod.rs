//! Cache module for storing fetched data to disk
//!
//! This module provides an expiring store that persists fetched payloads to the
//! filesystem under a configurable TTL (time-to-live). Entries older than the TTL
//! are never returned, and damaged entries are treated as misses, so the cache can
//! only ever make a fetch cheaper, never make it fail.

mod store;

pub use store::{CacheSettings, CachedData, ExpiringStore};
