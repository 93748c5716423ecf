use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    claims::TokenPurpose,
    jwt::TokenError,
    password::{hash_password, verify_password},
    repo_types::{NewUser, User},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Column widths in the `users` and `contacts` tables.
pub(crate) const EMAIL_MAX_CHARS: usize = 100;
const USERNAME_MAX_CHARS: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims, lower-cases and validates an account email.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Email must be at most {EMAIL_MAX_CHARS} characters"
        )));
    }
    Ok(email)
}

fn require_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Creates an unverified account and mails a verification link.
///
/// The user row is committed before the mail goes out; if delivery fails the
/// account stays unverified and the caller gets `EmailDeliveryFailed`.
#[instrument(skip(state, password))]
pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    username: Option<&str>,
) -> AppResult<User> {
    let email = normalize_email(email)?;
    require_password(password)?;
    let username = username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    if let Some(name) = &username {
        if name.chars().count() > USERNAME_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "Username must be at most {USERNAME_MAX_CHARS} characters"
            )));
        }
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(password)?;
    let user = state
        .users
        .create(NewUser {
            email,
            password_hash,
            username,
        })
        .await?;

    let token = state
        .tokens
        .issue_purpose(&user.email, TokenPurpose::Verify)?;
    state
        .mailer
        .send_verification(&user.email, &token)
        .await
        .map_err(AppError::EmailDeliveryFailed)?;

    info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Returns an access token. Unknown email and wrong password fail identically.
#[instrument(skip(state, password))]
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthenticated("Invalid credentials"));
    };

    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Invalid credentials"));
    }

    let token = state.tokens.issue_access(&user.email)?;

    let key = format!("user:{}", user.id);
    if let Err(e) = state
        .cache
        .set(&key, &user.email, state.config.cache_ttl_seconds)
        .await
    {
        warn!(error = %e, user_id = user.id, "cache write failed; continuing");
    }

    info!(user_id = user.id, "user logged in");
    Ok(token)
}

/// Parses a purpose token and loads the user it names.
async fn resolve_purpose_token(
    state: &AppState,
    token: &str,
    expected: TokenPurpose,
) -> AppResult<User> {
    let claims = state.tokens.parse(token)?;
    if claims.purpose != Some(expected) {
        warn!(expected = ?expected, got = ?claims.purpose, "token type mismatch");
        return Err(AppError::InvalidTokenType);
    }
    let Some(email) = claims.sub else {
        return Err(AppError::NotFound("User"));
    };
    state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Marks the token's user verified. Tokens are not consumed, so replaying an
/// unexpired verification token succeeds again.
#[instrument(skip_all)]
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<()> {
    let user = resolve_purpose_token(state, token, TokenPurpose::Verify).await?;
    let user = state.users.mark_verified(&user).await?;
    info!(user_id = user.id, "email verified");
    Ok(())
}

/// Unknown emails get `NotFound`, which reveals whether an account exists.
#[instrument(skip(state))]
pub async fn request_password_reset(state: &AppState, email: &str) -> AppResult<()> {
    let email = email.trim().to_lowercase();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let token = state.tokens.issue_purpose(&user.email, TokenPurpose::Reset)?;
    state
        .mailer
        .send_reset(&user.email, &token)
        .await
        .map_err(AppError::EmailDeliveryFailed)?;

    info!(user_id = user.id, "password reset requested");
    Ok(())
}

/// Sets a new password. Other outstanding reset tokens remain usable until
/// they expire, and concurrent confirmations race with last write winning.
#[instrument(skip_all)]
pub async fn confirm_password_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> AppResult<()> {
    let user = resolve_purpose_token(state, token, TokenPurpose::Reset).await?;
    require_password(new_password)?;
    state.users.update_password(&user, new_password).await?;
    info!(user_id = user.id, "password updated");
    Ok(())
}

/// Resolves a bearer access token to its user. Any token problem, including a
/// purpose-tagged token, is `Unauthenticated`.
pub async fn authenticate(state: &AppState, bearer: &str) -> AppResult<User> {
    let claims = match state.tokens.parse(bearer) {
        Ok(c) => c,
        Err(TokenError::Expired) => return Err(AppError::Unauthenticated("Token expired")),
        Err(TokenError::Malformed(_)) => {
            return Err(AppError::Unauthenticated("Could not validate credentials"))
        }
    };
    if claims.purpose.is_some() {
        warn!(purpose = ?claims.purpose, "purpose token presented as access token");
        return Err(AppError::Unauthenticated("Access token required"));
    }
    let Some(email) = claims.sub else {
        return Err(AppError::Unauthenticated("Invalid token"));
    };
    state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User"))
}
