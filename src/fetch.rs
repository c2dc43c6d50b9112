//! Cache-aware fetching with retries
//!
//! [`FetchOrchestrator`] ties the expiring store and the backoff executor
//! together for one logical data source at a time: serve from the store when
//! possible, otherwise fetch through the retry loop and remember the result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::cache::ExpiringStore;
use crate::retry::{BackoffExecutor, Classify, RetryError};

/// Where a fetched value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// A fresh entry in the store
    Cache,
    /// The upstream source, just now
    Live,
    /// Every attempt failed and the policy degraded to an empty value
    Degraded,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Cache => "cache",
            Origin::Live => "live",
            Origin::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// A value together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: Origin,
    /// When the data was fetched from upstream (the write time for cache hits)
    pub fetched_at: DateTime<Utc>,
}

/// Serves data from an [`ExpiringStore`], falling back to retried fetches
///
/// Cloning is cheap and clones share the same store, so one orchestrator can
/// serve concurrent fetches for independent sources.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    store: Arc<ExpiringStore>,
    executor: BackoffExecutor,
}

impl FetchOrchestrator {
    pub fn new(store: Arc<ExpiringStore>, executor: BackoffExecutor) -> Self {
        Self { store, executor }
    }

    pub fn store(&self) -> &ExpiringStore {
        &self.store
    }

    pub fn executor(&self) -> &BackoffExecutor {
        &self.executor
    }

    /// Returns the data for `source_key`, from the store if possible.
    ///
    /// # Behavior
    /// - Unless `force_refresh` is set, a fresh store entry is returned as
    ///   [`Origin::Cache`]
    /// - Otherwise `fetch` runs under the retry policy; a success is written to
    ///   the store and returned as [`Origin::Live`]
    /// - If the policy degrades gracefully, `T::default()` is returned as
    ///   [`Origin::Degraded`] and nothing is stored, so the next call tries the
    ///   source again instead of serving an empty result for a whole TTL
    /// - In strict mode the final error is returned
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &self,
        source_key: &str,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Fetched<T>, RetryError<E>>
    where
        T: Serialize + DeserializeOwned + Default,
        E: Classify + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(cached) = self.store.get_entry::<T>(source_key) {
                debug!(key = %source_key, cached_at = %cached.cached_at, "Serving from cache");
                return Ok(Fetched {
                    data: cached.data,
                    origin: Origin::Cache,
                    fetched_at: cached.cached_at,
                });
            }
        }

        match self.executor.execute_classified(fetch).await? {
            Some(data) => {
                self.store.set(source_key, &data);
                Ok(Fetched {
                    data,
                    origin: Origin::Live,
                    fetched_at: Utc::now(),
                })
            }
            None => {
                info!(key = %source_key, "Fetch degraded to empty result; not caching");
                Ok(Fetched {
                    data: T::default(),
                    origin: Origin::Degraded,
                    fetched_at: Utc::now(),
                })
            }
        }
    }
}
