use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockhold_core::{Clock, SystemClock};
use stockhold_inventory::{Capacity, Reservation, ReservationKey, ScanPattern, reserved_quantity};

use super::r#trait::{CommitOutcome, ReservationScan, ReservationStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    reservation: Reservation,
    deadline: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.deadline > now
    }
}

/// In-memory TTL store.
///
/// Intended for tests/dev and single-process deployments. Expired entries stay
/// in the map until [`ReservationStore::evict_expired`] runs but are invisible
/// to every read.
#[derive(Debug)]
pub struct InMemoryReservationStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Physically present entries, expired ones included.
    pub fn raw_len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    fn deadline(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn poisoned() -> StoreError {
        StoreError::unavailable("lock poisoned")
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn put(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let deadline = self.deadline(ttl);
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(
            key.render(),
            Entry {
                reservation: reservation.clone(),
                deadline,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &ReservationKey) -> Result<Option<Reservation>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .get(&key.render())
            .filter(|e| e.is_live(now))
            .map(|e| e.reservation.clone()))
    }

    async fn scan(&self, pattern: &ScanPattern) -> Result<ReservationScan, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .iter()
            .filter(|(k, e)| pattern.matches(k) && e.is_live(now))
            .map(|(_, e)| e.reservation.clone())
            .collect())
    }

    async fn put_within_capacity(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
        capacity: &Capacity,
    ) -> Result<CommitOutcome, StoreError> {
        let pattern = ScanPattern::SupplierProduct(key.pair());
        let deadline = self.deadline(ttl);
        let now = self.clock.now();

        // Aggregate and write under one write lock: no other writer can interleave.
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let reserved = reserved_quantity(
            entries
                .iter()
                .filter(|(k, e)| pattern.matches(k) && e.is_live(now))
                .map(|(_, e)| &e.reservation),
        );

        if !capacity.admits(reserved, u64::from(reservation.quantity.get())) {
            return Ok(CommitOutcome::Rejected { reserved });
        }

        entries.insert(
            key.render(),
            Entry {
                reservation: reservation.clone(),
                deadline,
            },
        );
        Ok(CommitOutcome::Committed)
    }

    async fn evict_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }
}
