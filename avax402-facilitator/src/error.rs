//! HTTP error envelope for the facilitator service.
//!
//! Only transport-level failures use this type. A payment that fails to
//! verify or settle is a normal `200` response carrying the failure in its
//! result shape.

use avax402::SchemaError;
use avax402_evm::chain::ChainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors that end a request with a non-`200` status.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    /// The request body failed schema validation.
    #[error("{0}")]
    InvalidRequest(#[from] SchemaError),

    /// Reading the signer balance failed.
    #[error("failed to read balance: {0}")]
    Balance(#[source] ChainError),

    /// Anything else that went wrong while serving the request.
    #[error("{0}")]
    Internal(String),
}

impl FacilitatorError {
    /// Machine-readable error code for the envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Balance(_) => "BALANCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status returned for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Balance(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FacilitatorError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": { "code": self.code(), "message": self.to_string() },
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_are_bad_requests() {
        let err = FacilitatorError::from(SchemaError::new(
            "paymentPayload.network",
            "is required",
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_REQUEST");
        assert_eq!(
            err.to_string(),
            "invalid field `paymentPayload.network`: is required"
        );
    }

    #[test]
    fn balance_failures_are_server_errors() {
        let err = FacilitatorError::Balance(ChainError::Custom("node down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "BALANCE_ERROR");
    }

    #[tokio::test]
    async fn internal_errors_use_the_envelope() {
        let response =
            FacilitatorError::Internal("failed to encode networks: boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": {
                    "code": "INTERNAL_ERROR",
                    "message": "failed to encode networks: boom",
                },
            })
        );
    }
}
