use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Contact, ContactPatch, NewContact};
use crate::error::{AppError, AppResult};

const CONTACT_COLUMNS: &str = "id, name, email, phone, address, owner_id";

/// Contact storage. Every lookup is scoped by owner inside the query itself, so a
/// contact that belongs to someone else is indistinguishable from a missing one.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, owner_id: i64, fields: NewContact) -> AppResult<Contact>;
    async fn list_by_owner(&self, owner_id: i64) -> AppResult<Vec<Contact>>;
    async fn find_by_owner_and_id(&self, owner_id: i64, contact_id: i64)
        -> AppResult<Option<Contact>>;
    /// Applies `patch` to `contact` and stores the result; unset fields keep their values.
    async fn update(&self, contact: &Contact, patch: &ContactPatch) -> AppResult<Contact>;
    async fn delete(&self, contact: &Contact) -> AppResult<()>;
}

pub struct PgContactRepository {
    db: PgPool,
}

impl PgContactRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create(&self, owner_id: i64, fields: NewContact) -> AppResult<Contact> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (name, email, phone, address, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(fields.name)
        .bind(fields.email)
        .bind(fields.phone)
        .bind(fields.address)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;
        Ok(contact)
    }

    async fn list_by_owner(&self, owner_id: i64) -> AppResult<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_owner_and_id(
        &self,
        owner_id: i64,
        contact_id: i64,
    ) -> AppResult<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND owner_id = $2"
        ))
        .bind(contact_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, contact: &Contact, patch: &ContactPatch) -> AppResult<Contact> {
        if patch.is_empty() {
            return Ok(contact.clone());
        }
        let mut next = contact.clone();
        patch.apply(&mut next);

        let updated = sqlx::query_as::<_, Contact>(&format!(
            r#"
            UPDATE contacts
            SET name = $1, email = $2, phone = $3, address = $4
            WHERE id = $5 AND owner_id = $6
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(next.name)
        .bind(next.email)
        .bind(next.phone)
        .bind(next.address)
        .bind(contact.id)
        .bind(contact.owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("Contact"))?;
        Ok(updated)
    }

    async fn delete(&self, contact: &Contact) -> AppResult<()> {
        sqlx::query("DELETE FROM contacts WHERE id = $1 AND owner_id = $2")
            .bind(contact.id)
            .bind(contact.owner_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
