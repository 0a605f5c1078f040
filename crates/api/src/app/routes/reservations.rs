use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockhold_core::{ProductId, SessionId, SupplierId};
use stockhold_infra::AdmissionError;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/reservations", post(create_reservation).get(list_reservations))
        .route("/reservations/:supplier_id/:product_id", get(list_pair_reservations))
        .route(
            "/reservations/:session_id/:supplier_id/:product_id",
            get(get_reservation),
        )
        .route("/availability/:supplier_id/:product_id", get(get_availability))
}

pub async fn create_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateReservationRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text());
        }
    };

    let request = match body.into_request() {
        Ok(r) => r,
        Err(e) => return errors::admission_error_to_response(AdmissionError::from(e)),
    };

    match services.try_reserve(request).await {
        Ok(reservation) => (
            StatusCode::CREATED,
            [(header::LOCATION, dto::reservation_location(&reservation))],
            Json(reservation),
        )
            .into_response(),
        Err(e) => errors::admission_error_to_response(e),
    }
}

pub async fn list_reservations(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_all().await {
        Ok(all) => Json(all).into_response(),
        Err(e) => errors::admission_error_to_response(e),
    }
}

pub async fn get_reservation(
    Extension(services): Extension<Arc<AppServices>>,
    Path((session_id, supplier_id, product_id)): Path<(String, String, String)>,
) -> axum::response::Response {
    let session_id: SessionId = match errors::parse_id(&session_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let supplier_id: SupplierId = match errors::parse_id(&supplier_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let product_id: ProductId = match errors::parse_id(&product_id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .get_by_session_supplier_product(&session_id, supplier_id, product_id)
        .await
    {
        Ok(Some(reservation)) => Json(reservation).into_response(),
        Ok(None) => errors::not_found("reservation not found"),
        Err(e) => errors::admission_error_to_response(e),
    }
}

pub async fn list_pair_reservations(
    Extension(services): Extension<Arc<AppServices>>,
    Path((supplier_id, product_id)): Path<(String, String)>,
) -> axum::response::Response {
    let supplier_id: SupplierId = match errors::parse_id(&supplier_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let product_id: ProductId = match errors::parse_id(&product_id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.list_by_supplier_product(supplier_id, product_id).await {
        Ok(list) => Json(list).into_response(),
        Err(e) => errors::admission_error_to_response(e),
    }
}

pub async fn get_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Path((supplier_id, product_id)): Path<(String, String)>,
) -> axum::response::Response {
    let supplier_id: SupplierId = match errors::parse_id(&supplier_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let product_id: ProductId = match errors::parse_id(&product_id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.availability(supplier_id, product_id).await {
        Ok(availability) => Json(availability).into_response(),
        // Unknown product on a read is 404.
        Err(AdmissionError::ProductNotFound(id)) => errors::not_found(format!("product {id} not found")),
        Err(e) => errors::admission_error_to_response(e),
    }
}
