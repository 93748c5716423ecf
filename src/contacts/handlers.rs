use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::AvatarResponse,
    repo_types::{Contact, ContactPatch, NewContact},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    rate_limit::ContactCreateQuota,
    state::AppState,
};

const AVATAR_MAX_BYTES: usize = 10 * 1024 * 1024;

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/avatar",
            put(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES)),
        )
        // older clients send a contact id; it is ignored
        .route(
            "/contacts/:id/avatar",
            put(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES)),
        )
        .route(
            "/contacts/:id",
            put(update_contact)
                .patch(update_contact)
                .delete(delete_contact),
        )
}

#[instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Contact>>> {
    Ok(Json(services::list(&state, &user).await?))
}

#[instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    _quota: ContactCreateQuota,
    Json(fields): Json<NewContact>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    let contact = services::create(&state, &user, fields).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[instrument(skip_all, fields(contact_id = id))]
pub async fn update_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<ContactPatch>,
) -> AppResult<Json<Contact>> {
    Ok(Json(services::update(&state, &user, id, patch).await?))
}

#[instrument(skip_all, fields(contact_id = id))]
pub async fn delete_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /contacts/avatar (multipart, field `file`). Always sets the caller's own avatar.
#[instrument(skip_all)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<AvatarResponse>> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            upload = Some((data, content_type));
            break;
        }
    }
    let (data, content_type) =
        upload.ok_or_else(|| AppError::Validation("file is required".into()))?;

    let avatar_url = services::upload_avatar(&state, &user, data, &content_type).await?;
    Ok(Json(AvatarResponse { avatar_url }))
}
