//! API error types and responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::flow::FlowError;
use crate::services::AddressValidationError;
use crate::validation::FieldErrors;

use super::session::CsrfError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Unknown flow kind, variant or step
    NotFound(String),
    /// Submitted form failed step validation
    Validation(FieldErrors),
    /// Request is well formed but cannot apply to this step
    BadRequest(String),
    /// CSRF token missing or wrong
    Forbidden(String),
    /// Internal server error
    InternalError(String),
}

/// Error response body
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Per-field error codes, present for validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, error, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Validation(errors) => {
                let message = format!("{} field(s) failed validation", errors.len());
                fields = Some(errors);
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
                fields,
            }),
        )
            .into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<CsrfError> for ApiError {
    fn from(err: CsrfError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<AddressValidationError> for ApiError {
    fn from(err: AddressValidationError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorCode;
    use http_body_util::BodyExt;

    async fn body(response: Response) -> ErrorResponse {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let error = ApiError::NotFound("Flow kind 'foo' not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body(response).await;
        assert_eq!(json.error, "not_found");
        assert!(json.fields.is_none());
    }

    #[tokio::test]
    async fn test_validation_response_carries_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("firstName", ErrorCode::Required);
        errors.add("socialInsuranceNumber", ErrorCode::InvalidSin);

        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body(response).await;
        assert_eq!(json.error, "validation_error");
        let fields = json.fields.unwrap();
        assert_eq!(fields.get("firstName"), &[ErrorCode::Required]);
        assert_eq!(fields.get("socialInsuranceNumber"), &[ErrorCode::InvalidSin]);
    }

    #[tokio::test]
    async fn test_csrf_error_is_forbidden() {
        let response = ApiError::from(CsrfError::Mismatch).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(response).await.error, "forbidden");
    }

    #[tokio::test]
    async fn test_invariant_violation_is_internal() {
        let response = ApiError::from(FlowError::invariant("child has no information"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
