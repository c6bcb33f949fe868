//! Product repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::{Price, Product, ProductId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    pub asset_id: Option<String>,
    pub sold_out: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            asset_id: row.asset_id,
            sold_out: row.sold_out,
            created_at: row.created_at,
        }
    }
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    pub asset_id: Option<String>,
    pub sold_out: bool,
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, description, price, image_url, asset_id, sold_out, created_at
            FROM souk.product
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, description, price, image_url, asset_id, sold_out, created_at
            FROM souk.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO souk.product (id, title, description, price, image_url, asset_id, sold_out)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, price, image_url, asset_id, sold_out, created_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(&product.asset_id)
        .bind(product.sold_out)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Set the sold-out flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn set_sold_out(
        &self,
        id: ProductId,
        sold_out: bool,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE souk.product
            SET sold_out = $2
            WHERE id = $1
            RETURNING id, title, description, price, image_url, asset_id, sold_out, created_at
            ",
        )
        .bind(id)
        .bind(sold_out)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a product, returning the removed row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            DELETE FROM souk.product
            WHERE id = $1
            RETURNING id, title, description, price, image_url, asset_id, sold_out, created_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
