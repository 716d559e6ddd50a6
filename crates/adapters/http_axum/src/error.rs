//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use fluxhub_domain::error::FluxHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`FluxHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(FluxHubError);

impl From<FluxHubError> for ApiError {
    fn from(err: FluxHubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FluxHubError::Validation(_) => StatusCode::BAD_REQUEST,
            FluxHubError::NotFound(_) => StatusCode::NOT_FOUND,
            FluxHubError::InvalidTransition(_) | FluxHubError::DuplicateId(_) => {
                StatusCode::CONFLICT
            }
            FluxHubError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            FluxHubError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FluxHubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
