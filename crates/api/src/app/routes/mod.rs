use axum::Router;

pub mod reservations;
pub mod system;

/// Router for all `/api` endpoints.
pub fn router() -> Router {
    Router::new().merge(reservations::router())
}
