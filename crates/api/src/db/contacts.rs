//! Contact form repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::{Contact, ContactId, Email, ValidContact};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: ContactId,
    name: String,
    email: String,
    phone: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            phone: row.phone,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

/// Repository for contact form submissions.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, contact: &ValidContact) -> Result<Contact, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO souk.contact (id, name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, message, created_at
            ",
        )
        .bind(ContactId::generate())
        .bind(&contact.name)
        .bind(contact.email.as_str())
        .bind(&contact.phone)
        .bind(&contact.message)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Submissions newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, name, email, phone, message, created_at
            FROM souk.contact
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Number of submissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM souk.contact")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
