//! TTL-bounded reservation storage boundary.
//!
//! The admission controller only talks to [`ReservationStore`]; backends decide
//! how expiry and the atomic conditional commit are realised.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod r#trait;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use stockhold_inventory::{Capacity, Reservation, ReservationKey, ScanPattern};

pub use in_memory::InMemoryReservationStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisReservationStore;
pub use r#trait::{CommitOutcome, ReservationScan, ReservationStore, StoreError};

/// Adapter that bounds every store call by a fixed time budget.
///
/// A call that overruns is abandoned and surfaces as [`StoreError::Unavailable`].
/// For writes that means "outcome unknown": the inner store may still have
/// applied it.
#[derive(Debug, Clone)]
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "reservation store timed out");
                Err(StoreError::unavailable(format!(
                    "{op} timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl<S> ReservationStore for TimeoutStore<S>
where
    S: ReservationStore,
{
    async fn put(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.bounded("put", self.inner.put(key, reservation, ttl)).await
    }

    async fn get(&self, key: &ReservationKey) -> Result<Option<Reservation>, StoreError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn scan(&self, pattern: &ScanPattern) -> Result<ReservationScan, StoreError> {
        self.bounded("scan", self.inner.scan(pattern)).await
    }

    async fn put_within_capacity(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
        capacity: &Capacity,
    ) -> Result<CommitOutcome, StoreError> {
        self.bounded(
            "put_within_capacity",
            self.inner.put_within_capacity(key, reservation, ttl, capacity),
        )
        .await
    }

    async fn evict_expired(&self) -> Result<usize, StoreError> {
        self.bounded("evict_expired", self.inner.evict_expired()).await
    }
}
