use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        LoginRequest, MessageResponse, PasswordResetConfirm, PasswordResetRequest, PublicUser,
        RegisterRequest, TokenForm, TokenResponse, VerifyQuery,
    },
    extractors::AuthUser,
    services,
};
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/token", post(token))
        .route("/auth/verify", get(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(
        &state,
        &payload.email,
        &payload.password,
        payload.username.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = services::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip(state, form))]
pub async fn token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> AppResult<Json<TokenResponse>> {
    let token = services::login(&state, &form.username, &form.password).await?;
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(q): Query<VerifyQuery>,
) -> AppResult<Json<MessageResponse>> {
    services::verify_email(&state, &q.token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified",
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        message: "Password reset email sent",
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> AppResult<Json<MessageResponse>> {
    services::confirm_password_reset(&state, &payload.token, &payload.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}

pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::testing::{Harness, SentKind};

    fn router(h: &Harness) -> Router {
        auth_routes().merge(me_routes()).with_state(h.state.clone())
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn public_user_hides_password_hash() {
        let h = Harness::new();
        let user = services::register(&h.state, "a@x.com", "pw123456", None)
            .await
            .unwrap();
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[tokio::test]
    async fn register_returns_created_then_conflict() {
        let h = Harness::new();
        let body = r#"{"email":"a@x.com","password":"pw123456"}"#;
        let res = router(&h).oneshot(json_post("/auth/register", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = router(&h).oneshot(json_post("/auth/register", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn token_form_and_me() {
        let h = Harness::new();
        services::register(&h.state, "a@x.com", "pw123456", None).await.unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=a%40x.com&password=pw123456"))
            .unwrap();
        let res = router(&h).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let token = h.state.tokens.issue_access("a@x.com").unwrap();
        let req = Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(router(&h).oneshot(req).await.unwrap().status(), StatusCode::OK);

        let req = Request::builder().uri("/me").body(Body::empty()).unwrap();
        assert_eq!(
            router(&h).oneshot(req).await.unwrap().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn verify_link_and_wrong_token_type() {
        let h = Harness::new();
        services::register(&h.state, "a@x.com", "pw123456", None).await.unwrap();
        let verify = h.mailer.last_token(SentKind::Verification).unwrap();

        let req = Request::builder()
            .uri(format!("/auth/verify?token={verify}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(router(&h).oneshot(req).await.unwrap().status(), StatusCode::OK);

        let body = format!(r#"{{"token":"{verify}","new_password":"x"}}"#);
        let res = router(&h)
            .oneshot(json_post("/auth/reset-password", &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forgot_password_unknown_email_is_404() {
        let h = Harness::new();
        let res = router(&h)
            .oneshot(json_post("/auth/forgot-password", r#"{"email":"ghost@x.com"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
