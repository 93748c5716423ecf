use bytes::Bytes;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::{Contact, ContactPatch, NewContact, Patch};
use crate::{
    auth::{
        repo_types::User,
        services::{is_valid_email, EMAIL_MAX_CHARS},
    },
    error::{AppError, AppResult},
    state::AppState,
    storage::ext_from_mime,
};

const NAME_MAX_CHARS: usize = 100;
const PHONE_MAX_CHARS: usize = 30;

fn check_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name must not be empty".into()));
    }
    check_len("Name", name, NAME_MAX_CHARS)
}

fn validate_contact_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    check_len("Email", email, EMAIL_MAX_CHARS)
}

fn validate_phone(phone: Option<&str>) -> AppResult<()> {
    match phone {
        Some(p) => check_len("Phone", p, PHONE_MAX_CHARS),
        None => Ok(()),
    }
}

pub async fn list(state: &AppState, user: &User) -> AppResult<Vec<Contact>> {
    state.contacts.list_by_owner(user.id).await
}

#[instrument(skip(state, user, fields), fields(user_id = user.id))]
pub async fn create(state: &AppState, user: &User, mut fields: NewContact) -> AppResult<Contact> {
    validate_name(&fields.name)?;
    validate_contact_email(&fields.email)?;
    validate_phone(fields.phone.as_deref())?;
    fields.email = fields.email.trim().to_string();

    let contact = state.contacts.create(user.id, fields).await?;
    info!(contact_id = contact.id, "contact created");
    Ok(contact)
}

/// Loads a contact through the ownership-scoped lookup; foreign and missing look the same.
async fn owned(state: &AppState, user: &User, contact_id: i64) -> AppResult<Contact> {
    state
        .contacts
        .find_by_owner_and_id(user.id, contact_id)
        .await?
        .ok_or(AppError::NotFound("Contact"))
}

#[instrument(skip(state, user, patch), fields(user_id = user.id))]
pub async fn update(
    state: &AppState,
    user: &User,
    contact_id: i64,
    mut patch: ContactPatch,
) -> AppResult<Contact> {
    if let Some(name) = patch.name.as_value() {
        validate_name(name)?;
    }
    if let Patch::Value(email) = &mut patch.email {
        validate_contact_email(email)?;
        *email = email.trim().to_string();
    }
    if let Some(phone) = patch.phone.as_value() {
        validate_phone(phone.as_deref())?;
    }

    let contact = owned(state, user, contact_id).await?;
    let updated = state.contacts.update(&contact, &patch).await?;
    info!(contact_id, "contact updated");
    Ok(updated)
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete(state: &AppState, user: &User, contact_id: i64) -> AppResult<()> {
    let contact = owned(state, user, contact_id).await?;
    state.contacts.delete(&contact).await?;
    info!(contact_id, "contact deleted");
    Ok(())
}

/// Stores the image and records its URL on the current user.
#[instrument(skip(state, user, body), fields(user_id = user.id, size = body.len()))]
pub async fn upload_avatar(
    state: &AppState,
    user: &User,
    body: Bytes,
    content_type: &str,
) -> AppResult<String> {
    if body.is_empty() {
        return Err(AppError::Validation("Empty file".into()));
    }
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation("Avatar must be an image".into()));
    }

    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("avatars/{}/{}.{}", user.id, Uuid::new_v4(), ext);
    let url = state
        .avatars
        .upload(&key, body, content_type)
        .await
        .map_err(AppError::UploadFailed)?;

    state.users.update_avatar(user, &url).await?;
    info!(%url, "avatar updated");
    Ok(url)
}
