//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error body is JSON:
//!
//! ```json
//! { "message": "Access denied", "code": "forbidden", "error": "optional detail" }
//! ```

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use atelier_core::design::DesignError;
use atelier_core::ledger::LedgerError;
use atelier_core::order::OrderError;
use atelier_core::{AccessError, ProfileId};

use crate::db::{RepositoryError, WithdrawalError};
use crate::models::ProductError;
use crate::services::{BlobError, IdentityError, SynthesisError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid bearer credential.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Role or ownership check failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Withdrawal exceeds the ledger balance.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// A collaborator (identity, storage, synthesis) failed.
    #[error("Upstream {service} error: {message}")]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The auth identity exists but its profile could not be created.
    #[error("Profile incomplete for {user_id}")]
    ProfileIncomplete { user_id: ProfileId },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InsufficientBalance(_) => "insufficient_balance",
            Self::Upstream { .. } => "upstream_error",
            Self::ProfileIncomplete { .. } => "profile_incomplete",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::InsufficientBalance(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::ProfileIncomplete { .. } => StatusCode::CREATED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Upstream { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let code = self.code();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Database(_) | Self::Internal(_) => {
                json!({ "message": "Internal server error", "code": code })
            }
            Self::Upstream {
                service,
                status,
                message,
            } => {
                let detail = match status {
                    Some(status) => format!("{service} returned {status}: {message}"),
                    None => format!("{service}: {message}"),
                };
                json!({ "message": "upstream error", "code": code, "error": detail })
            }
            Self::ProfileIncomplete { user_id } => json!({
                "message": "registered but failed to create profile",
                "code": code,
                "userId": user_id,
            }),
            Self::Unauthenticated(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::InvalidRequest(message)
            | Self::InsufficientBalance(message) => json!({ "message": message, "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Not found".to_string()),
            RepositoryError::Conflict(message) => Self::InvalidRequest(message),
            other => Self::Database(other),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::RoleDenied { .. } => {
                Self::Forbidden("Access denied. Insufficient permissions.".to_string())
            }
            AccessError::NotOwner { .. } => Self::Forbidden("Access denied".to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NonPositiveAmount => {
                Self::InvalidRequest("Invalid withdrawal amount".to_string())
            }
            LedgerError::SubCentAmount(_) => Self::InvalidRequest(err.to_string()),
            LedgerError::InsufficientBalance { .. } => {
                Self::InsufficientBalance("Insufficient wallet balance".to_string())
            }
        }
    }
}

impl From<WithdrawalError> for AppError {
    fn from(err: WithdrawalError) -> Self {
        match err {
            WithdrawalError::Rejected(e) => e.into(),
            WithdrawalError::Repository(e) => e.into(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<DesignError> for AppError {
    fn from(err: DesignError) -> Self {
        match err {
            DesignError::InconsistentReview(_) => Self::Internal(err.to_string()),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        let (status, message) = match err {
            IdentityError::Rejected { status, message } => (Some(status), message),
            other => (None, other.to_string()),
        };
        Self::Upstream {
            service: "identity",
            status,
            message,
        }
    }
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::InvalidPath(message) => Self::InvalidRequest(message),
            BlobError::Api { status, message } => Self::Upstream {
                service: "storage",
                status: Some(status),
                message,
            },
            other => Self::Upstream {
                service: "storage",
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<SynthesisError> for AppError {
    fn from(err: SynthesisError) -> Self {
        let (status, message) = match err {
            SynthesisError::Api { status, message } => (Some(status), message),
            other => (None, other.to_string()),
        };
        Self::Upstream {
            service: "synthesis",
            status,
            message,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::InvalidRequest(err.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for a lifecycle action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("designs", "Design approved", Some(&[("design_id", "DES-007")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use atelier_core::DesignStatus;
    use rust_decimal::Decimal;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientBalance("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["code"], "internal_error");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_upstream_preserves_status_and_message() {
        let err = AppError::from(SynthesisError::Api {
            status: 429,
            message: "rate limited".into(),
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "upstream error");
        assert_eq!(body["error"], "synthesis returned 429: rate limited");
    }

    #[tokio::test]
    async fn test_insufficient_balance_code() {
        let err = AppError::from(LedgerError::InsufficientBalance {
            requested: Decimal::new(150, 0),
            available: Decimal::new(70, 0),
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "insufficient_balance");
        assert_eq!(body["message"], "Insufficient wallet balance");
    }

    #[tokio::test]
    async fn test_design_transition_is_invalid_request() {
        let err = AppError::from(DesignError::IllegalTransition {
            from: DesignStatus::Rejected,
            to: DesignStatus::Approved,
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
        assert_eq!(body["message"], "cannot move a design from rejected to approved");
    }

    #[test]
    fn test_sub_cent_amount_is_invalid_request() {
        let err = AppError::from(LedgerError::SubCentAmount(Decimal::new(1, 3)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err = AppError::from(RepositoryError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
