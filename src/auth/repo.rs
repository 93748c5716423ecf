use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    password::hash_password,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, username, is_verified, avatar_url, created_at";

/// Lookup and mutation of user records. Absence is `Ok(None)`, never an error.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    /// Fails with `Conflict` when the email, or the username if given, is taken.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
    /// Re-hashes `new_password` and stores it. Outstanding tokens stay valid.
    async fn update_password(&self, user: &User, new_password: &str) -> AppResult<User>;
    async fn update_avatar(&self, user: &User, url: &str) -> AppResult<User>;
    /// Idempotent.
    async fn mark_verified(&self, user: &User) -> AppResult<User>;
}

/// Names the taken field from the violated unique constraint.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("username") => "Username already taken",
        _ => "Email already registered",
    }
}

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, username)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.username)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict(conflict_message(db_err.constraint()).into()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, user: &User, new_password: &str) -> AppResult<User> {
        let hash = hash_password(new_password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(hash)
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_avatar(&self, user: &User, url: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar_url = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(url)
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_verified(&self, user: &User) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = TRUE WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}
