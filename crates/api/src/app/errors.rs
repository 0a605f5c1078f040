use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockhold_core::DomainError;
use stockhold_infra::AdmissionError;

pub fn admission_error_to_response(err: AdmissionError) -> axum::response::Response {
    match err {
        AdmissionError::ProductNotFound(_) => {
            json_error(StatusCode::BAD_REQUEST, "product_not_found", err.to_string())
        }
        AdmissionError::CapacityExceeded { .. } => {
            json_error(StatusCode::BAD_REQUEST, "capacity_exceeded", err.to_string())
        }
        AdmissionError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AdmissionError::StoreUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn not_found(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Parse a path segment into a typed id, or a 400 `invalid_id` response.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhold_core::{ProductId, SupplierId};

    #[test]
    fn admission_errors_map_to_status_codes() {
        let cases = [
            (AdmissionError::ProductNotFound(ProductId::new(1)), StatusCode::BAD_REQUEST),
            (
                AdmissionError::CapacityExceeded {
                    requested: 1,
                    reserved: 10,
                    capacity: 10,
                },
                StatusCode::BAD_REQUEST,
            ),
            (AdmissionError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AdmissionError::StoreUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(admission_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn parse_id_rejects_non_integers() {
        assert_eq!(parse_id::<SupplierId>("7").unwrap(), SupplierId::new(7));
        assert_eq!(
            parse_id::<ProductId>("seven").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
