use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockhold_core::ProductId;
use stockhold_inventory::Capacity;

use super::{LedgerError, StockLedger};

/// In-memory stock ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    quantities: RwLock<HashMap<ProductId, u64>>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products<I>(products: I) -> Self
    where
        I: IntoIterator<Item = (ProductId, u64)>,
    {
        Self {
            quantities: RwLock::new(products.into_iter().collect()),
        }
    }

    pub fn set_quantity(&self, product_id: ProductId, quantity: u64) {
        if let Ok(mut map) = self.quantities.write() {
            map.insert(product_id, quantity);
        }
    }

    pub fn remove(&self, product_id: ProductId) {
        if let Ok(mut map) = self.quantities.write() {
            map.remove(&product_id);
        }
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn capacity(&self, product_id: ProductId) -> Result<Capacity, LedgerError> {
        let map = self
            .quantities
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;
        map.get(&product_id)
            .map(|q| Capacity::new(product_id, *q))
            .ok_or(LedgerError::NotFound(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_product_reports_its_quantity() {
        let ledger = InMemoryStockLedger::with_products([(ProductId::new(1), 10)]);
        assert_eq!(
            ledger.capacity(ProductId::new(1)).await.unwrap(),
            Capacity::new(ProductId::new(1), 10)
        );
    }

    #[tokio::test]
    async fn unknown_or_removed_product_is_not_found() {
        let ledger = InMemoryStockLedger::new();
        assert_eq!(
            ledger.capacity(ProductId::new(9)).await,
            Err(LedgerError::NotFound(ProductId::new(9)))
        );

        ledger.set_quantity(ProductId::new(9), 4);
        assert!(ledger.capacity(ProductId::new(9)).await.is_ok());

        ledger.remove(ProductId::new(9));
        assert!(matches!(
            ledger.capacity(ProductId::new(9)).await,
            Err(LedgerError::NotFound(_))
        ));
    }
}
