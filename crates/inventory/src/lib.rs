//! Inventory reservation domain module.
//!
//! This crate contains the business rules for soft stock holds, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage): the
//! reservation record and its composite key, the scan patterns the store must
//! answer, and the capacity arithmetic the admission controller relies on.

pub mod capacity;
pub mod reservation;

pub use capacity::{Availability, Capacity};
pub use reservation::{
    KEY_PREFIX, Quantity, Reservation, ReservationKey, ReservationRequest, ScanPattern,
    SupplierProduct, reserved_quantity,
};
