use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
///
/// Lifecycle and escrow failures are distinct variants so callers can tell
/// "the card was declined" from "the gateway timed out" from "this status
/// change is not legal" without string matching.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Validation errors for business rules (bad amounts, missing reason, bad input lengths)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested status change not permitted by the lifecycle table
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// The payment gateway declined the operation (e.g. insufficient funds)
    #[error("Gateway rejected: {0}")]
    GatewayRejected(String),

    /// Transient gateway connectivity/timeout failure; safe to retry the whole operation
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Hold is in a remote state that cannot be captured (expired, canceled)
    #[error("Hold not capturable: {0}")]
    HoldNotCapturable(String),

    /// Refund requested against a hold in the wrong remote state
    #[error("Refund rejected: {0}")]
    RefundRejected(String),

    /// Refund requested for a hold that was never captured
    #[error("Nothing to refund: {0}")]
    NothingToRefund(String),

    /// A job already has an active quote
    #[error("Duplicate quote: {0}")]
    DuplicateQuote(String),

    /// Optimistic concurrency check failed; caller should reread and decide
    #[error("Stale job state: {0}")]
    StaleJobState(String),

    /// Cancellation blocked because captured funds are held; admin refund required first
    #[error("Captured funds held: {0}")]
    CapturedFundsHeld(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "kind": self.kind(),
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::GatewayRejected(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::HoldNotCapturable(_) => StatusCode::CONFLICT,
            AppError::RefundRejected(_) => StatusCode::CONFLICT,
            AppError::NothingToRefund(_) => StatusCode::CONFLICT,
            AppError::DuplicateQuote(_) => StatusCode::CONFLICT,
            AppError::StaleJobState(_) => StatusCode::CONFLICT,
            AppError::CapturedFundsHeld(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Stable machine-readable discriminant, used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::GatewayRejected(_) => "gateway_rejected",
            AppError::GatewayUnavailable(_) => "gateway_unavailable",
            AppError::HoldNotCapturable(_) => "hold_not_capturable",
            AppError::RefundRejected(_) => "refund_rejected",
            AppError::NothingToRefund(_) => "nothing_to_refund",
            AppError::DuplicateQuote(_) => "duplicate_quote",
            AppError::StaleJobState(_) => "stale_job_state",
            AppError::CapturedFundsHeld(_) => "captured_funds_held",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::RateLimitExceeded(_) => "rate_limited",
            AppError::Database(_) => "database",
            AppError::Json(_) => "json",
            AppError::Configuration(_) => "configuration",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the whole operation may be retried verbatim by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GatewayUnavailable(_) | AppError::StaleJobState(_)
        )
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        AppError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::invalid_transition("submitted", "completed").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::GatewayRejected("card declined".into()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::GatewayUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::NothingToRefund("diagnostic".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::GatewayUnavailable("timeout".into()).is_retryable());
        assert!(AppError::StaleJobState("job-1".into()).is_retryable());
        assert!(!AppError::GatewayRejected("declined".into()).is_retryable());
        assert!(!AppError::invalid_transition("a", "b").is_retryable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::invalid_transition("submitted", "completed");
        assert_eq!(
            err.to_string(),
            "Invalid transition from 'submitted' to 'completed'"
        );
        assert_eq!(err.kind(), "invalid_transition");
    }
}
