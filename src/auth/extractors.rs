use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{repo_types::User, services::authenticate};
use crate::{error::AppError, state::AppState};

/// Extracts the bearer token and resolves it to the current user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthenticated("Missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::Unauthenticated("Invalid auth scheme"))?;

        let user = authenticate(state, token.trim()).await?;
        Ok(AuthUser(user))
    }
}
