use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;

/// Failure kinds surfaced by the workflows. Each maps to a stable (code, message) pair.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Invalid token type")]
    InvalidTokenType,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,

    #[error("Avatar upload failed")]
    UploadFailed(#[source] anyhow::Error),

    #[error("Email delivery failed")]
    EmailDeliveryFailed(#[source] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidTokenType
            | AppError::Expired
            | AppError::Malformed
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UploadFailed(_) | AppError::EmailDeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Conflict(_) => "conflict",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::InvalidTokenType => "invalid_token_type",
            AppError::NotFound(_) => "not_found",
            AppError::Expired => "token_expired",
            AppError::Malformed => "invalid_token",
            AppError::UploadFailed(_) => "upload_failed",
            AppError::EmailDeliveryFailed(_) => "email_delivery_failed",
            AppError::Validation(_) => "validation",
            AppError::RateLimited => "rate_limited",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(e).context("database"))
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::Expired,
            TokenError::Malformed(_) => AppError::Malformed,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Internal(e) => error!(error = ?e, "internal error"),
            AppError::UploadFailed(e) | AppError::EmailDeliveryFailed(e) => {
                error!(error = ?e, code = self.code(), "collaborator failure")
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.code(),
            "detail": self.to_string(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}
