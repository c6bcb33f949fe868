//! Owner account repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::{AdminUserId, Username};

use super::{RepositoryError, conflict_on_unique};
use crate::models::AdminUser;

#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: AdminUserId,
    username: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            username,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: AdminUserId,
    username: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

/// Repository for the owner account.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether any owner account exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn any_exists(&self) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM souk.admin_user)")
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create the owner account.
    ///
    /// The table admits a single row, so this fails once an account exists,
    /// including when two registrations race.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an account already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO souk.admin_user (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, created_at
            ",
        )
        .bind(AdminUserId::generate())
        .bind(username.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "an owner account already exists"))?;

        row.try_into()
    }

    /// Look up an account and its password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, username, created_at, password_hash
            FROM souk.admin_user
            WHERE username = $1
            ",
        )
        .bind(username.trim())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = AdminUser::try_from(AdminUserRow {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        })?;

        Ok(Some((user, row.password_hash)))
    }
}
