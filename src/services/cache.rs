// src/services/cache.rs

use crate::errors::{AppError, AppResult};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};
use tracing::debug;

/// Identity of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl CacheKey {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: body.into(),
        }
    }
}

type Shared = Option<Result<Value, String>>;

enum Slot {
    Ready { value: Value, inserted_at: Instant },
    InFlight { rx: watch::Receiver<Shared> },
}

/// TTL response cache with in-flight deduplication.
///
/// Held in `AppState` and passed by reference; entries are valid while
/// `now < inserted_at + ttl`. Concurrent requests for the same key collapse
/// onto one computation: the first caller becomes the leader and the rest
/// await its published result. Failed computations are not cached.
pub struct ApiCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

enum Role {
    Leader(watch::Sender<Shared>),
    Follower(watch::Receiver<Shared>),
}

impl ApiCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> AppResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Value>>,
    {
        let role = {
            let mut slots = self.slots.lock().await;
            match slots.get(&key) {
                Some(Slot::Ready { value, inserted_at }) if inserted_at.elapsed() < self.ttl => {
                    debug!(method = %key.method, path = %key.path, "cache hit");
                    return Ok(value.clone());
                }
                Some(Slot::InFlight { rx }) => Role::Follower(rx.clone()),
                _ => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.clone(), Slot::InFlight { rx });
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => loop {
                if let Some(result) = rx.borrow_and_update().clone() {
                    return result.map_err(AppError::Internal);
                }
                if rx.changed().await.is_err() {
                    // Leader dropped without publishing.
                    return Err(AppError::Internal("cached fetch was aborted".to_string()));
                }
            },
            Role::Leader(tx) => {
                let result = fetch().await;
                {
                    let mut slots = self.slots.lock().await;
                    match &result {
                        Ok(value) => {
                            slots.insert(
                                key,
                                Slot::Ready {
                                    value: value.clone(),
                                    inserted_at: Instant::now(),
                                },
                            );
                        }
                        Err(_) => {
                            slots.remove(&key);
                        }
                    }
                }
                let shared = result
                    .as_ref()
                    .map(Value::clone)
                    .map_err(|e| e.to_string());
                let _ = tx.send(Some(shared));
                result
            }
        }
    }

    /// Drop every entry whose path starts with `path_prefix`. Called by
    /// mutating handlers so stale summaries are not served.
    pub async fn invalidate_prefix(&self, path_prefix: &str) {
        let mut slots = self.slots.lock().await;
        slots.retain(|key, _| !key.path.starts_with(path_prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(path: &str) -> CacheKey {
        CacheKey::new("GET", path, "")
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_is_served_from_cache() {
        let cache = ApiCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key("/reports/summary"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"total_income": "1000.00"}))
                })
                .await
                .unwrap();
            assert_eq!(value["total_income"], "1000.00");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let cache = ApiCache::new(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_fetch(key("/reports/summary"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(1))
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_identical_requests_collapse_into_one_fetch() {
        let cache = Arc::new(ApiCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!(42))
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch(key("/reports/summary"), {
                let calls = Arc::clone(&calls);
                move || fetch(calls)
            }),
            cache.get_or_fetch(key("/reports/summary"), {
                let calls = Arc::clone(&calls);
                move || fetch(calls)
            }),
        );

        assert_eq!(a.unwrap(), json!(42));
        assert_eq!(b.unwrap(), json!(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ApiCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch(key("/reports/summary"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Internal("boom".to_string()))
            })
            .await;
        assert!(err.is_err());

        let value = cache
            .get_or_fetch(key("/reports/summary"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(7))
            })
            .await
            .unwrap();
        assert_eq!(value, json!(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prefix_invalidation_drops_matching_entries() {
        let cache = ApiCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for path in ["/api/v1/reports/summary", "/api/v1/records"] {
            cache
                .get_or_fetch(key(path), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(path))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate_prefix("/api/v1/reports").await;

        for path in ["/api/v1/reports/summary", "/api/v1/records"] {
            cache
                .get_or_fetch(key(path), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(path))
                })
                .await
                .unwrap();
        }
        // Only the invalidated report entry was refetched.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
