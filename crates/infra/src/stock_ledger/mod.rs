//! Read-only view of per-product stock, owned by the catalog side of the system.
//!
//! The admission controller asks for a product's capacity once per decision and
//! never caches the answer.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockhold_core::ProductId;
use stockhold_inventory::Capacity;

pub use in_memory::InMemoryStockLedger;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStockLedger;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("stock ledger unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Total stock of `product_id`; `NotFound` if the product does not exist.
    async fn capacity(&self, product_id: ProductId) -> Result<Capacity, LedgerError>;
}

#[async_trait]
impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    async fn capacity(&self, product_id: ProductId) -> Result<Capacity, LedgerError> {
        (**self).capacity(product_id).await
    }
}
