use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "sales_suspended",
    "message": "Sales are suspended for site shop-42",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Short machine-readable reason
    #[schema(example = "sales_suspended")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden origin: {0}")]
    ForbiddenOrigin(String),

    #[error("Sales are suspended for site {0}")]
    SalesSuspended(String),

    #[error("Connected sub-account missing: {0}")]
    SubAccountMissing(String),

    #[error("No purchasable items in cart")]
    NothingPurchasable,

    #[error("Idempotency key conflict: {0}")]
    IdempotencyConflict(String),

    #[error("{0}")]
    UpstreamGateway(String),

    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<crate::gateway::GatewayError> for ServiceError {
    fn from(err: crate::gateway::GatewayError) -> Self {
        ServiceError::UpstreamGateway(err.to_string())
    }
}

impl From<crate::webhooks::SignatureError> for ServiceError {
    fn from(err: crate::webhooks::SignatureError) -> Self {
        ServiceError::SignatureError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_)
            | Self::SubAccountMissing(_)
            | Self::NothingPurchasable
            | Self::SignatureError(_) => StatusCode::BAD_REQUEST,
            Self::ForbiddenOrigin(_) | Self::SalesSuspended(_) => StatusCode::FORBIDDEN,
            Self::IdempotencyConflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::UpstreamGateway(_)
            | Self::SerializationError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason placed in the `error` field.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::ForbiddenOrigin(_) => "forbidden_origin",
            Self::SalesSuspended(_) => "sales_suspended",
            Self::SubAccountMissing(_) => "sub_account_missing",
            Self::NothingPurchasable => "nothing_purchasable",
            Self::IdempotencyConflict(_) => "idempotency_conflict",
            Self::UpstreamGateway(_) => "upstream_gateway_error",
            Self::SignatureError(_) => "invalid_signature",
            Self::DatabaseError(_) => "database_error",
            Self::SerializationError(_) | Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages; gateway errors pass the upstream text through.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: self.reason().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NothingPurchasable.into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "nothing_purchasable");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::SubAccountMissing("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::ForbiddenOrigin("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::SalesSuspended("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::SignatureError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UpstreamGateway("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::IdempotencyConflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn response_message_hides_internal_details_but_passes_gateway_text() {
        assert_eq!(
            ServiceError::InternalError("lock poisoned".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(sea_orm::DbErr::Custom("disk full".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::UpstreamGateway("No such price".into()).response_message(),
            "No such price"
        );
    }
}
