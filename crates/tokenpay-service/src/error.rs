//! API error types and responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tokenpay_core::BillingError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Webhook delivery that failed verification. Rendered as plain text,
    /// which is what the provider's dashboard displays.
    #[error("Webhook Error: {0}")]
    Webhook(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Webhook(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    self.to_string(),
                )
                    .into_response();
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            Self::ExternalService(msg) => {
                tracing::error!(error = %msg, "Payments provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "external_service_error",
                    "The payments provider could not complete the request".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Authentication(msg) => Self::Webhook(msg),
            // Identifiers stay in the logs, not in the response.
            BillingError::NotFound { entity, id } => {
                tracing::warn!(entity = entity, id = %id, "Lookup failed");
                Self::NotFound(format!("{entity} not found"))
            }
            BillingError::InvalidPayload(msg) | BillingError::DataIntegrity(msg) => {
                Self::BadRequest(msg)
            }
            BillingError::InvalidId(e) => Self::BadRequest(e.to_string()),
            BillingError::TransientProvider(msg) | BillingError::ExternalService(msg) => {
                Self::ExternalService(msg)
            }
            BillingError::Storage(msg)
            | BillingError::Timeout(msg)
            | BillingError::Configuration(msg) => Self::Internal(msg),
        }
    }
}

impl From<tokenpay_store::StoreError> for ApiError {
    fn from(err: tokenpay_store::StoreError) -> Self {
        BillingError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_hides_identifier() {
        let err = ApiError::from(BillingError::NotFound {
            entity: "active price",
            id: "prod_secret".into(),
        });
        assert!(matches!(&err, ApiError::NotFound(msg) if !msg.contains("prod_secret")));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn webhook_error_is_plain_text_bad_request() {
        let response = ApiError::Webhook("no signatures".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn downstream_failures_are_server_errors() {
        for err in [
            BillingError::Storage("disk".into()),
            BillingError::Timeout("credit write".into()),
        ] {
            let status = ApiError::from(err).into_response().status();
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }
        let status = ApiError::from(BillingError::TransientProvider("503".into()))
            .into_response()
            .status();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
