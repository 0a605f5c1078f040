//! Reservation admission (application-level orchestration).
//!
//! The controller combines a [`StockLedger`] (how much exists) with a
//! [`ReservationStore`] (how much is currently held) and decides whether a new
//! hold fits.
//!
//! ## Admission Flow
//!
//! ```text
//! ReservationRequest
//!   ↓
//! 1. Fetch capacity from the stock ledger (no pair lock held)
//!   ↓
//! 2. Aggregate unexpired holds for (supplier, product), including any hold at the same key
//!   ↓
//! 3. Compare aggregate + requested against capacity
//!   ↓
//! 4. Write the reservation with the configured TTL
//! ```
//!
//! Steps 2-4 are serialized per (supplier, product). With
//! [`AdmissionMode::ProcessLock`] an in-process mutex per pair is held across
//! them; with [`AdmissionMode::StoreAtomic`] the store runs them as a single
//! conditional commit.
//!
//! There is no retry inside the controller. Reservation keys are
//! deterministic, so a caller retrying after `StoreUnavailable` lands on its
//! own slot and never creates a second hold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use stockhold_core::{Clock, DomainError, ProductId, SessionId, SupplierId, SystemClock};
use stockhold_inventory::{
    Availability, Capacity, Reservation, ReservationKey, ReservationRequest, ScanPattern,
    SupplierProduct, reserved_quantity,
};

use crate::config::{AdmissionMode, ReservationConfig};
use crate::reservation_store::{CommitOutcome, ReservationStore, StoreError, TimeoutStore};
use crate::stock_ledger::{LedgerError, StockLedger};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("requested {requested} exceeds capacity ({reserved} of {capacity} already reserved)")]
    CapacityExceeded {
        requested: u64,
        reserved: u64,
        capacity: u64,
    },

    /// The store (or ledger) did not answer in time or failed. For a write the
    /// outcome is unknown.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<StoreError> for AdmissionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => AdmissionError::StoreUnavailable(msg),
            StoreError::Serialization(msg) => {
                AdmissionError::StoreUnavailable(format!("unreadable reservation value: {msg}"))
            }
        }
    }
}

impl From<LedgerError> for AdmissionError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(product_id) => AdmissionError::ProductNotFound(product_id),
            LedgerError::Unavailable(msg) => AdmissionError::StoreUnavailable(msg),
        }
    }
}

impl From<DomainError> for AdmissionError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                AdmissionError::Validation(msg)
            }
        }
    }
}

/// Registry of per-(supplier, product) async mutexes.
///
/// Entries are created on first use and pruned when the last guard for a pair
/// is dropped with nobody else holding the entry.
#[derive(Debug, Default)]
pub(crate) struct PairLocks {
    inner: Mutex<HashMap<SupplierProduct, Arc<tokio::sync::Mutex<()>>>>,
}

impl PairLocks {
    pub(crate) async fn lock(&self, pair: SupplierProduct) -> PairGuard<'_> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.entry(pair).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        PairGuard {
            locks: self,
            pair,
            guard: Some(guard),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn release(&self, pair: &SupplierProduct) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mutex) = map.get(pair) {
            if Arc::strong_count(mutex) == 1 {
                map.remove(pair);
            }
        }
    }
}

/// Held pair lock. Dropping it (including via future cancellation) unlocks.
pub(crate) struct PairGuard<'a> {
    locks: &'a PairLocks,
    pair: SupplierProduct,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before checking whether the entry can go.
        drop(self.guard.take());
        self.locks.release(&self.pair);
    }
}

/// Decides whether reservation requests fit within available stock.
///
/// ## Generic Parameters
///
/// - `L`: stock ledger (capacity source)
/// - `S`: reservation store; every call is bounded by `config.store_timeout`
pub struct ReservationAdmissionController<L, S> {
    ledger: L,
    store: TimeoutStore<S>,
    locks: PairLocks,
    clock: Arc<dyn Clock>,
    config: ReservationConfig,
}

impl<L, S> std::fmt::Debug for ReservationAdmissionController<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationAdmissionController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<L, S> ReservationAdmissionController<L, S>
where
    L: StockLedger,
    S: ReservationStore,
{
    pub fn new(ledger: L, store: S, config: ReservationConfig) -> Self {
        Self::with_clock(ledger, store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(ledger: L, store: S, config: ReservationConfig, clock: Arc<dyn Clock>) -> Self {
        let store = TimeoutStore::new(store, config.store_timeout);
        Self {
            ledger,
            store,
            locks: PairLocks::default(),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    /// Admit `request` if the pair's unexpired holds plus the requested quantity
    /// stay within the product's capacity.
    ///
    /// A request whose key matches an existing hold replaces it (last write
    /// wins). The existing hold still counts toward the aggregate it is
    /// checked against.
    pub async fn try_reserve(&self, request: ReservationRequest) -> Result<Reservation, AdmissionError> {
        let key = request.key();

        // 1) Capacity (never under the pair lock)
        let capacity = match self.ledger.capacity(request.product_id).await {
            Ok(capacity) => capacity,
            Err(err @ LedgerError::NotFound(_)) => {
                info!(
                    session_id = %request.session_id,
                    supplier_id = %request.supplier_id,
                    product_id = %request.product_id,
                    error = %err,
                    "reservation rejected: product not found"
                );
                return Err(err.into());
            }
            Err(err) => {
                warn!(
                    session_id = %request.session_id,
                    supplier_id = %request.supplier_id,
                    product_id = %request.product_id,
                    error = %err,
                    "reservation outcome unknown: capacity lookup failed"
                );
                return Err(err.into());
            }
        };

        let reservation = request.into_reservation(self.expires_at());

        // 2-4) Check and commit, serialized per pair
        let result = match self.config.mode {
            AdmissionMode::ProcessLock => self.commit_locked(&key, &reservation, &capacity).await,
            AdmissionMode::StoreAtomic => self.commit_atomic(&key, &reservation, &capacity).await,
        };

        match &result {
            Ok(()) => info!(
                session_id = %key.session_id,
                supplier_id = %key.supplier_id,
                product_id = %key.product_id,
                requested = reservation.quantity.get(),
                capacity = capacity.quantity,
                expires_at = %reservation.expires_at,
                "reservation admitted"
            ),
            Err(AdmissionError::CapacityExceeded { requested, reserved, capacity }) => info!(
                session_id = %key.session_id,
                supplier_id = %key.supplier_id,
                product_id = %key.product_id,
                requested,
                reserved,
                capacity,
                "reservation rejected: capacity exceeded"
            ),
            Err(err) => warn!(
                session_id = %key.session_id,
                supplier_id = %key.supplier_id,
                product_id = %key.product_id,
                error = %err,
                "reservation outcome unknown"
            ),
        }

        result.map(|()| reservation)
    }

    async fn commit_locked(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        capacity: &Capacity,
    ) -> Result<(), AdmissionError> {
        let _guard = self.locks.lock(key.pair()).await;

        let held = self.store.scan(&ScanPattern::SupplierProduct(key.pair())).await?;
        let reserved = reserved_quantity(&held);
        let requested = u64::from(reservation.quantity.get());

        if !capacity.admits(reserved, requested) {
            return Err(AdmissionError::CapacityExceeded {
                requested,
                reserved,
                capacity: capacity.quantity,
            });
        }

        self.store.put(key, reservation, self.config.ttl).await?;
        Ok(())
    }

    async fn commit_atomic(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        capacity: &Capacity,
    ) -> Result<(), AdmissionError> {
        match self
            .store
            .put_within_capacity(key, reservation, self.config.ttl, capacity)
            .await?
        {
            CommitOutcome::Committed => Ok(()),
            CommitOutcome::Rejected { reserved } => Err(AdmissionError::CapacityExceeded {
                requested: u64::from(reservation.quantity.get()),
                reserved,
                capacity: capacity.quantity,
            }),
        }
    }

    fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        let ttl = chrono::Duration::from_std(self.config.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let now = self.clock.now();
        now.checked_add_signed(ttl).unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Every unexpired reservation.
    pub async fn list_all(&self) -> Result<Vec<Reservation>, AdmissionError> {
        Ok(self.store.scan(&ScanPattern::All).await?.into_vec())
    }

    pub async fn get_by_session_supplier_product(
        &self,
        session_id: &SessionId,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Option<Reservation>, AdmissionError> {
        let key = ReservationKey::new(session_id.clone(), supplier_id, product_id);
        Ok(self.store.get(&key).await?)
    }

    pub async fn list_by_supplier_product(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Vec<Reservation>, AdmissionError> {
        Ok(self
            .store
            .scan(&ScanPattern::for_pair(supplier_id, product_id))
            .await?
            .into_vec())
    }

    /// Point-in-time headroom for a pair. Not a promise: a concurrent admission
    /// may consume it immediately.
    pub async fn availability(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Availability, AdmissionError> {
        let capacity = self.ledger.capacity(product_id).await?;
        let held = self
            .store
            .scan(&ScanPattern::for_pair(supplier_id, product_id))
            .await?;
        Ok(capacity.availability(reserved_quantity(&held)))
    }

    /// Pairs that currently have a lock entry (held or awaited).
    pub fn locked_pairs(&self) -> usize {
        self.locks.len()
    }
}
