use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the core, mapped to stable wire codes.
///
/// Financial failures carry a generic message to the end user; the specific
/// reason stays on the underlying entity (`failed` entry, `disputed` match)
/// for operator review.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable string code returned to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::NotFound(_) => "not-found",
            AppError::FailedPrecondition(_) => "failed-precondition",
            AppError::InsufficientFunds => "insufficient-funds",
            AppError::PermissionDenied => "permission-denied",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::arena::PairingError> for AppError {
    fn from(err: crate::arena::PairingError) -> Self {
        use crate::arena::PairingError::*;
        match err {
            AccountNotFound => AppError::NotFound(err.to_string()),
            InvalidStake => AppError::InvalidArgument(err.to_string()),
            AlreadyQueued | AlreadyInMatch | NothingToCancel => {
                AppError::FailedPrecondition(err.to_string())
            }
            InsufficientFunds => AppError::InsufficientFunds,
            Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<crate::arena::ResultError> for AppError {
    fn from(err: crate::arena::ResultError) -> Self {
        use crate::arena::ResultError::*;
        match err {
            MatchNotFound => AppError::NotFound(err.to_string()),
            NotAParticipant | InvalidWinner => AppError::InvalidArgument(err.to_string()),
            AlreadyResolved | AlreadySubmitted | AlreadyDistributed | NotReviewable => {
                AppError::FailedPrecondition(err.to_string())
            }
            Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<crate::arena::FundingError> for AppError {
    fn from(err: crate::arena::FundingError) -> Self {
        use crate::arena::FundingError::*;
        match err {
            AccountNotFound | RequestNotFound => AppError::NotFound(err.to_string()),
            InvalidAmount => AppError::InvalidArgument(err.to_string()),
            AlreadyDecided => AppError::FailedPrecondition(err.to_string()),
            InsufficientFunds => AppError::InsufficientFunds,
            RefundFailed | Db(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::FailedPrecondition(_) => StatusCode::CONFLICT,
            AppError::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
