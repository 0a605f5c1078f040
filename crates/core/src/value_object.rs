//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; two instances with the same attributes
//! are interchangeable. In this domain `Quantity`, `Capacity` and the
//! supplier/product scope are value objects, while a reservation is an entity
//! identified by its composite key.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new instance.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
