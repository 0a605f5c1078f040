use serde::Deserialize;

use stockhold_core::{DomainError, ProductId, SessionId, SupplierId};
use stockhold_inventory::{Quantity, Reservation, ReservationRequest};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/reservations`.
///
/// Fields are accepted loosely typed and validated in [`CreateReservationRequest::into_request`],
/// so a negative or zero quantity is a `validation_error` instead of a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub session_id: String,
    pub supplier_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

impl CreateReservationRequest {
    pub fn into_request(self) -> Result<ReservationRequest, DomainError> {
        let session_id = SessionId::new(self.session_id)?;
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| DomainError::validation("quantity is too large"))?;

        Ok(ReservationRequest::new(
            session_id,
            SupplierId::new(self.supplier_id),
            ProductId::new(self.product_id),
            Quantity::new(quantity)?,
        ))
    }
}

// -------------------------
// Response helpers
// -------------------------

/// Canonical URL of a reservation (value of the `Location` header on create).
pub fn reservation_location(reservation: &Reservation) -> String {
    format!(
        "/api/reservations/{}/{}/{}",
        reservation.session_id, reservation.supplier_id, reservation.product_id
    )
}
