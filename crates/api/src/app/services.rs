use std::sync::Arc;

use stockhold_core::{ProductId, SessionId, SupplierId};
use stockhold_infra::{
    AdmissionError, ExpirySweeper, ExpirySweeperHandle, InMemoryReservationStore,
    InMemoryStockLedger, ReservationAdmissionController,
};
use stockhold_inventory::{Availability, Reservation, ReservationRequest};

#[cfg(feature = "persistent")]
use stockhold_infra::{
    config::AdmissionMode, reservation_store::RedisReservationStore,
    stock_ledger::PostgresStockLedger,
};

use crate::config::AppConfig;

type InMemoryController =
    ReservationAdmissionController<Arc<InMemoryStockLedger>, Arc<InMemoryReservationStore>>;

#[cfg(feature = "persistent")]
type PersistentController = ReservationAdmissionController<PostgresStockLedger, RedisReservationStore>;

/// Backing services behind the HTTP handlers.
pub enum AppServices {
    InMemory {
        controller: Arc<InMemoryController>,
        /// Kept alive for the lifetime of the services; dropping stops the sweep.
        _sweeper: ExpirySweeperHandle,
    },
    #[cfg(feature = "persistent")]
    Persistent {
        controller: Arc<PersistentController>,
    },
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        #[cfg(feature = "persistent")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "persistent"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but persistent feature not enabled, falling back to in-memory"
            );
        }
    }

    Ok(build_in_memory_services(config))
}

/// In-memory wiring (dev/test): ledger + store + sweeper.
///
/// Must be called from within a tokio runtime (the sweeper is spawned).
pub fn build_in_memory_services(config: &AppConfig) -> AppServices {
    let ledger = Arc::new(InMemoryStockLedger::with_products(
        config.seed_products.iter().copied(),
    ));
    let store = Arc::new(InMemoryReservationStore::new());
    let sweeper = ExpirySweeper::new(config.reservation.sweep_interval).spawn(store.clone());
    let controller = Arc::new(ReservationAdmissionController::new(
        ledger,
        store,
        config.reservation.clone(),
    ));

    tracing::info!(
        products = config.seed_products.len(),
        mode = ?config.reservation.mode,
        "using in-memory reservation store and stock ledger"
    );

    AppServices::InMemory {
        controller,
        _sweeper: sweeper,
    }
}

#[cfg(feature = "persistent")]
async fn build_persistent_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    use anyhow::Context;

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;

    let ledger = PostgresStockLedger::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = RedisReservationStore::connect(&config.redis_url)
        .await
        .context("failed to connect to Redis")?;

    // The store is shared across processes; only its atomic commit serializes pairs.
    if config.reservation.mode != AdmissionMode::StoreAtomic {
        tracing::info!("persistent stores force admission mode StoreAtomic");
    }
    let reservation = config.reservation.clone().with_mode(AdmissionMode::StoreAtomic);

    tracing::info!(redis_url = %config.redis_url, "using Redis reservation store and Postgres stock ledger");

    Ok(AppServices::Persistent {
        controller: Arc::new(ReservationAdmissionController::new(ledger, store, reservation)),
    })
}

impl AppServices {
    pub async fn try_reserve(&self, request: ReservationRequest) -> Result<Reservation, AdmissionError> {
        match self {
            AppServices::InMemory { controller, .. } => controller.try_reserve(request).await,
            #[cfg(feature = "persistent")]
            AppServices::Persistent { controller } => controller.try_reserve(request).await,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Reservation>, AdmissionError> {
        match self {
            AppServices::InMemory { controller, .. } => controller.list_all().await,
            #[cfg(feature = "persistent")]
            AppServices::Persistent { controller } => controller.list_all().await,
        }
    }

    pub async fn get_by_session_supplier_product(
        &self,
        session_id: &SessionId,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Option<Reservation>, AdmissionError> {
        match self {
            AppServices::InMemory { controller, .. } => {
                controller
                    .get_by_session_supplier_product(session_id, supplier_id, product_id)
                    .await
            }
            #[cfg(feature = "persistent")]
            AppServices::Persistent { controller } => {
                controller
                    .get_by_session_supplier_product(session_id, supplier_id, product_id)
                    .await
            }
        }
    }

    pub async fn list_by_supplier_product(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Vec<Reservation>, AdmissionError> {
        match self {
            AppServices::InMemory { controller, .. } => {
                controller.list_by_supplier_product(supplier_id, product_id).await
            }
            #[cfg(feature = "persistent")]
            AppServices::Persistent { controller } => {
                controller.list_by_supplier_product(supplier_id, product_id).await
            }
        }
    }

    pub async fn availability(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Availability, AdmissionError> {
        match self {
            AppServices::InMemory { controller, .. } => {
                controller.availability(supplier_id, product_id).await
            }
            #[cfg(feature = "persistent")]
            AppServices::Persistent { controller } => {
                controller.availability(supplier_id, product_id).await
            }
        }
    }
}
