use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{DomainError, DomainResult, Entity, ProductId, SessionId, SupplierId, ValueObject};

/// Prefix of every physical reservation key.
pub const KEY_PREFIX: &str = "key_";

/// Reserved amount of a single hold. Always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<u32> for Quantity {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The (supplier, product) scope that capacity is aggregated and serialized over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierProduct {
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
}

impl SupplierProduct {
    pub fn new(supplier_id: SupplierId, product_id: ProductId) -> Self {
        Self {
            supplier_id,
            product_id,
        }
    }

    /// Trailing `_<supplierId>_<productId>` shared by every key of this pair.
    pub fn key_suffix(&self) -> String {
        format!("_{}_{}", self.supplier_id, self.product_id)
    }
}

impl ValueObject for SupplierProduct {}

impl core::fmt::Display for SupplierProduct {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "supplier {} / product {}", self.supplier_id, self.product_id)
    }
}

/// Composite identity of a reservation slot: `(sessionId, supplierId, productId)`.
///
/// Its rendered form `key_<sessionId>_<supplierId>_<productId>` is the physical
/// store key and part of the external contract: suffix scans depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReservationKey {
    pub session_id: SessionId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
}

impl ReservationKey {
    pub fn new(session_id: SessionId, supplier_id: SupplierId, product_id: ProductId) -> Self {
        Self {
            session_id,
            supplier_id,
            product_id,
        }
    }

    pub fn pair(&self) -> SupplierProduct {
        SupplierProduct::new(self.supplier_id, self.product_id)
    }

    /// Physical store key.
    pub fn render(&self) -> String {
        format!(
            "{KEY_PREFIX}{}_{}_{}",
            self.session_id, self.supplier_id, self.product_id
        )
    }
}

impl core::fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Which entries a store scan should enumerate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScanPattern {
    /// Every reservation entry.
    All,
    /// Entries whose key ends with `_<supplierId>_<productId>`.
    SupplierProduct(SupplierProduct),
}

impl ScanPattern {
    pub fn for_pair(supplier_id: SupplierId, product_id: ProductId) -> Self {
        Self::SupplierProduct(SupplierProduct::new(supplier_id, product_id))
    }

    /// Whether a rendered store key belongs to this pattern.
    ///
    /// Matching is purely textual (prefix + suffix), exactly like a key glob
    /// `key_*_<s>_<p>` on the shared store.
    pub fn matches(&self, raw_key: &str) -> bool {
        if !raw_key.starts_with(KEY_PREFIX) {
            return false;
        }
        match self {
            ScanPattern::All => true,
            ScanPattern::SupplierProduct(pair) => {
                let suffix = pair.key_suffix();
                raw_key.len() > KEY_PREFIX.len() + suffix.len() && raw_key.ends_with(&suffix)
            }
        }
    }
}

/// A reservation request that has not been admitted yet (never persisted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub session_id: SessionId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl ReservationRequest {
    pub fn new(
        session_id: SessionId,
        supplier_id: SupplierId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Self {
        Self {
            session_id,
            supplier_id,
            product_id,
            quantity,
        }
    }

    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(self.session_id.clone(), self.supplier_id, self.product_id)
    }

    pub fn pair(&self) -> SupplierProduct {
        SupplierProduct::new(self.supplier_id, self.product_id)
    }

    /// Activate the request with an absolute expiry.
    pub fn into_reservation(self, expires_at: DateTime<Utc>) -> Reservation {
        Reservation {
            session_id: self.session_id,
            supplier_id: self.supplier_id,
            product_id: self.product_id,
            quantity: self.quantity,
            expires_at,
        }
    }
}

/// An admitted, time-bounded hold on stock.
///
/// Serialized as camelCase JSON; this is also the value format written to the
/// reservation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub session_id: SessionId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(self.session_id.clone(), self.supplier_id, self.product_id)
    }

    pub fn pair(&self) -> SupplierProduct {
        SupplierProduct::new(self.supplier_id, self.product_id)
    }

    /// Expired holds no longer count against capacity. Expiry is inclusive:
    /// a hold whose `expires_at` equals `now` is already gone.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Entity for Reservation {
    type Id = ReservationKey;

    fn id(&self) -> Self::Id {
        self.key()
    }
}

/// Total quantity held by a set of reservations.
///
/// A commutative fold, so store enumeration order never affects admission.
pub fn reserved_quantity<'a, I>(reservations: I) -> u64
where
    I: IntoIterator<Item = &'a Reservation>,
{
    reservations
        .into_iter()
        .fold(0u64, |acc, r| acc + u64::from(r.quantity.get()))
}
