use serde::{Deserialize, Serialize};

use stockhold_core::{ProductId, ValueObject};

/// Total reservable stock of a product, as reported by the stock ledger.
///
/// Read-only to this crate: capacity is never adjusted by reservations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub product_id: ProductId,
    pub quantity: u64,
}

impl Capacity {
    pub fn new(product_id: ProductId, quantity: u64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    /// Whether `requested` more units fit next to `reserved` already-held units.
    pub fn admits(&self, reserved: u64, requested: u64) -> bool {
        match reserved.checked_add(requested) {
            Some(total) => total <= self.quantity,
            None => false,
        }
    }

    pub fn availability(&self, reserved: u64) -> Availability {
        Availability {
            capacity: self.quantity,
            reserved,
            remaining: self.quantity.saturating_sub(reserved),
        }
    }
}

impl ValueObject for Capacity {}

/// Point-in-time view of a (supplier, product) pair's headroom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub capacity: u64,
    pub reserved: u64,
    pub remaining: u64,
}

impl ValueObject for Availability {}
