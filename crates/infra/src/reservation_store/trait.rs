use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use stockhold_inventory::{Capacity, Reservation, ReservationKey, ScanPattern};

/// Reservation store operation error.
///
/// These are **infrastructure errors**. Every variant means the store could not
/// answer within its operation budget, so callers must treat a failed `put` as
/// "outcome unknown", never as "not written".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("reservation store unavailable: {0}")]
    Unavailable(String),

    #[error("reservation value could not be (de)serialized: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Outcome of an atomic conditional commit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The reservation was written.
    Committed,
    /// Nothing was written; `reserved` is the pair aggregate the decision saw.
    Rejected { reserved: u64 },
}

/// Result of a pattern scan: a finite snapshot of unexpired reservations.
///
/// Iterating borrows the snapshot, so the same scan can be walked again from
/// the start (or cloned and consumed). Order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationScan {
    items: Vec<Reservation>,
}

impl ReservationScan {
    pub fn new(items: Vec<Reservation>) -> Self {
        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reservation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Reservation> {
        self.items
    }
}

impl IntoIterator for ReservationScan {
    type Item = Reservation;
    type IntoIter = std::vec::IntoIter<Reservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReservationScan {
    type Item = &'a Reservation;
    type IntoIter = std::slice::Iter<'a, Reservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Reservation> for ReservationScan {
    fn from_iter<T: IntoIterator<Item = Reservation>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Shared, TTL-bounded storage of reservation records.
///
/// ## Expiry semantics
///
/// Reads are **lazily expiring**: `get` and `scan` must never return an entry
/// whose TTL has elapsed, even if it is still physically present. Physical
/// removal happens through `evict_expired` (or natively, for stores with TTL
/// support).
///
/// ## Keys
///
/// Entries are addressed by [`ReservationKey::render`]; pattern scans match on
/// that rendered form (see [`ScanPattern::matches`]).
///
/// ## Implementation requirements
///
/// - `put` is an upsert that resets the TTL to `ttl` from the call time
/// - `put_within_capacity` must be atomic with respect to every other write on
///   the same store
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Upsert `reservation` at `key`, expiring `ttl` from now.
    async fn put(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Exact-key lookup; `None` if absent or expired.
    async fn get(&self, key: &ReservationKey) -> Result<Option<Reservation>, StoreError>;

    /// Enumerate unexpired entries matching `pattern`.
    async fn scan(&self, pattern: &ScanPattern) -> Result<ReservationScan, StoreError>;

    /// Atomically: sum unexpired entries of the key's (supplier, product) pair,
    /// skipping the entry at `key` itself, and write only if
    /// `sum + reservation.quantity <= capacity`.
    async fn put_within_capacity(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
        capacity: &Capacity,
    ) -> Result<CommitOutcome, StoreError>;

    /// Physically remove expired entries, returning how many were removed.
    async fn evict_expired(&self) -> Result<usize, StoreError>;
}

#[async_trait]
impl<S> ReservationStore for Arc<S>
where
    S: ReservationStore + ?Sized,
{
    async fn put(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        (**self).put(key, reservation, ttl).await
    }

    async fn get(&self, key: &ReservationKey) -> Result<Option<Reservation>, StoreError> {
        (**self).get(key).await
    }

    async fn scan(&self, pattern: &ScanPattern) -> Result<ReservationScan, StoreError> {
        (**self).scan(pattern).await
    }

    async fn put_within_capacity(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
        capacity: &Capacity,
    ) -> Result<CommitOutcome, StoreError> {
        (**self).put_within_capacity(key, reservation, ttl, capacity).await
    }

    async fn evict_expired(&self) -> Result<usize, StoreError> {
        (**self).evict_expired().await
    }
}
