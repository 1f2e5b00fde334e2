//! Users repository for authentication and account management
//!
//! Handles users and their refresh tokens.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{
    decode_err, int_to_bool, now_iso8601, str_to_datetime, str_to_datetime_opt, str_to_uuid,
    uuid_to_str,
};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

/// Username prefix given to anonymized accounts; never accepted at registration
pub const DELETED_USERNAME_PREFIX: &str = "deleted-";

// ============================================================================
// User Records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub anonymized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for UserRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: String = row.try_get("id")?;
        let is_active: i32 = row.try_get("is_active")?;
        let last_login_at: Option<String> = row.try_get("last_login_at")?;
        let anonymized_at: Option<String> = row.try_get("anonymized_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self {
            id: str_to_uuid(&id).map_err(decode_err)?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            is_active: int_to_bool(is_active),
            last_login_at: str_to_datetime_opt(last_login_at.as_deref()).map_err(decode_err)?,
            anonymized_at: str_to_datetime_opt(anonymized_at.as_deref()).map_err(decode_err)?,
            created_at: str_to_datetime(&created_at).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_at).map_err(decode_err)?,
        })
    }
}

/// A new account. The role is assigned on insert: the first account ever
/// created is the admin, every later one a member.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

// ============================================================================
// Refresh Token Records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for RefreshTokenRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: String = row.try_get("id")?;
        let user_id: String = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        Ok(Self {
            id: str_to_uuid(&id).map_err(decode_err)?,
            user_id: str_to_uuid(&user_id).map_err(decode_err)?,
            token_hash: row.try_get("token_hash")?,
            expires_at: str_to_datetime(&expires_at).map_err(decode_err)?,
        })
    }
}

// ============================================================================
// Repository
// ============================================================================

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_active, \
     last_login_at, anonymized_at, created_at, updated_at";

pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // User CRUD
    // ========================================================================

    /// Create a new user.
    ///
    /// The admin check and the insert are one statement, so concurrent first
    /// registrations cannot both become admin. Anonymized rows are kept and
    /// still count, so the role is never handed out a second time.
    pub async fn create(&self, user: CreateUser) -> Result<UserRecord> {
        let id = Uuid::new_v4();
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, is_active, created_at, updated_at)
            SELECT ?, ?, ?, ?,
                   CASE WHEN EXISTS (SELECT 1 FROM users) THEN ? ELSE ? END,
                   1, ?, ?
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(ROLE_MEMBER)
        .bind(ROLE_ADMIN)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create user"))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(uuid_to_str(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Get user by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE username = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Get user by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Update user's last login timestamp
    pub async fn update_last_login(&self, id: Uuid) -> Result<u64> {
        let now = now_iso8601();
        let result = sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Scrub personal data from an account and deactivate it.
    ///
    /// The username becomes `deleted-<full id>`, which is unique per account
    /// and cannot be registered. Favorites and refresh tokens are removed in
    /// the same transaction.
    pub async fn anonymize(&self, id: Uuid) -> Result<bool> {
        let id_str = uuid_to_str(id);
        let now = now_iso8601();
        let placeholder = format!("{}{}", DELETED_USERNAME_PREFIX, id_str);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = NULL, password_hash = '', is_active = 0,
                last_login_at = NULL, anonymized_at = ?, updated_at = ?
            WHERE id = ? AND anonymized_at IS NULL
            "#,
        )
        .bind(&placeholder)
        .bind(&now)
        .bind(&now)
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM favorites WHERE user_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Refresh Tokens
    // ========================================================================

    pub async fn create_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_to_str(Uuid::new_v4()))
        .bind(uuid_to_str(user_id))
        .bind(token_hash)
        .bind(super::sqlite_helpers::datetime_to_str(expires_at))
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up an unexpired refresh token by hash
    pub async fn get_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, expires_at
            FROM refresh_tokens
            WHERE token_hash = ? AND expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(now_iso8601())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Returns false when the token was already gone, e.g. consumed by a
    /// concurrent refresh.
    pub async fn delete_refresh_token(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop a user's expired refresh tokens
    pub async fn purge_expired_refresh_tokens(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND expires_at <= ?")
            .bind(uuid_to_str(user_id))
            .bind(now_iso8601())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
