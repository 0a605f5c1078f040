//! Postgres-backed stock ledger.
//!
//! Reads the `product` table maintained by the catalog service. This crate
//! never writes to it.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use stockhold_core::ProductId;
use stockhold_inventory::Capacity;

use super::{LedgerError, StockLedger};

const CAPACITY_QUERY: &str = "SELECT quantity FROM product WHERE id = $1";

#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: Arc<PgPool>,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("postgres connection failed: {e}")))?;
        Ok(Self::new(pool))
    }
}

/// Stored quantities can drift negative after manual corrections; nothing is
/// reservable then.
fn clamp_quantity(stored: i64) -> u64 {
    u64::try_from(stored).unwrap_or(0)
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn capacity(&self, product_id: ProductId) -> Result<Capacity, LedgerError> {
        let stored = sqlx::query_scalar::<_, i32>(CAPACITY_QUERY)
            .bind(product_id.value())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        match stored {
            Some(q) => Ok(Capacity::new(product_id, clamp_quantity(i64::from(q)))),
            None => Err(LedgerError::NotFound(product_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_stock_clamps_to_zero() {
        assert_eq!(clamp_quantity(-3), 0);
        assert_eq!(clamp_quantity(0), 0);
        assert_eq!(clamp_quantity(42), 42);
    }
}
