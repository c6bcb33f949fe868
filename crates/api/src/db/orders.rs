//! Order repository, including the checkout transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use souk_core::{
    CreateOrderRequest, LineItem, Order, OrderId, OrderRequestError, OrderState, ProductId,
};

use super::RepositoryError;
use super::products::ProductRow;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    items: Json<Vec<LineItem>>,
    phone: String,
    city: String,
    location: String,
    state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let state: OrderState = row.state.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order state in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            items: row.items.0,
            phone: row.phone,
            city: row.city,
            location: row.location,
            state,
            created_at: row.created_at,
        })
    }
}

/// Why a checkout was refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Invalid(#[from] OrderRequestError),

    /// Referenced products that do not exist.
    #[error("unknown products: {0:?}")]
    UnknownProducts(Vec<ProductId>),

    /// Titles of referenced products that are sold out.
    #[error("sold out: {0:?}")]
    SoldOut(Vec<String>),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

const ORDER_COLUMNS: &str = "id, items, phone, city, location, state, created_at";

/// Repository for customer orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Referenced products are read with a shared row lock inside the same
    /// transaction as the insert, so a concurrent sold-out toggle is ordered
    /// entirely before or after this checkout. Title and unit price come from
    /// the product rows, not the request.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Invalid` for malformed requests,
    /// `UnknownProducts` / `SoldOut` when referenced products are missing or
    /// sold out, and `Repository` for database failures.
    #[tracing::instrument(skip_all, fields(lines = request.products.len()))]
    pub async fn place(&self, request: &CreateOrderRequest) -> Result<Order, CheckoutError> {
        let quantities = request.quantities()?;
        let ids: Vec<ProductId> = quantities.keys().copied().collect();

        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, description, price, image_url, asset_id, sold_out, created_at
            FROM souk.product
            WHERE id = ANY($1)
            ORDER BY id
            FOR SHARE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        let products: HashMap<ProductId, ProductRow> =
            rows.into_iter().map(|row| (row.id, row)).collect();

        // Request order, first occurrence of each product.
        let mut seen = HashSet::new();
        let ordered: Vec<ProductId> = request
            .products
            .iter()
            .map(|line| line.product_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let unknown: Vec<ProductId> = ordered
            .iter()
            .filter(|id| !products.contains_key(id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Err(CheckoutError::UnknownProducts(unknown));
        }

        let sold_out: Vec<String> = ordered
            .iter()
            .filter_map(|id| products.get(id))
            .filter(|p| p.sold_out)
            .map(|p| p.title.clone())
            .collect();
        if !sold_out.is_empty() {
            return Err(CheckoutError::SoldOut(sold_out));
        }

        let items: Vec<LineItem> = ordered
            .iter()
            .filter_map(|id| {
                let product = products.get(id)?;
                Some(LineItem {
                    product_id: *id,
                    title: product.title.clone(),
                    price: product.price,
                    quantity: quantities.get(id).copied().unwrap_or(1),
                })
            })
            .collect();

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO souk.customer_order (id, items, phone, city, location, state)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(OrderId::generate())
        .bind(Json(&items))
        .bind(request.phone.trim())
        .bind(request.city.trim())
        .bind(request.location.trim())
        .bind(OrderState::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.try_into()?)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM souk.customer_order ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Change an order's state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn set_state(&self, id: OrderId, state: OrderState) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE souk.customer_order SET state = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(state.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM souk.customer_order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every order. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM souk.customer_order")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
