//! Customer orders and checkout requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{OrderId, OrderState, Price, ProductId};

const fn one() -> u32 {
    1
}

/// One product line of a placed order.
///
/// Title and unit price are snapshotted from the catalog when the order is
/// placed, so later catalog edits do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Older orders were stored without a quantity; those count as one unit.
    #[serde(default = "one")]
    pub quantity: u32,
}

impl LineItem {
    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A placed customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "products")]
    pub items: Vec<LineItem>,
    pub phone: String,
    pub city: String,
    pub location: String,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of unit price times quantity over every line.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(LineItem::total).sum()
    }
}

/// A requested line in a checkout request.
///
/// Browsers send the whole cart line (`id`, `title`, `price`, `quantity`);
/// only the product reference and quantity are trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

/// Errors in a checkout request detected before touching the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderRequestError {
    /// No line items.
    #[error("Order must contain at least one product")]
    Empty,

    /// Phone, city or location missing.
    #[error("All fields are required")]
    MissingShipping,

    /// A line asked for zero units.
    #[error("Quantity must be at least 1")]
    ZeroQuantity,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub products: Vec<LineItemRequest>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub location: String,
}

impl CreateOrderRequest {
    /// Validate shape and return the requested quantities per product.
    ///
    /// Lines naming the same product are merged by summing their quantities.
    ///
    /// # Errors
    ///
    /// Returns `OrderRequestError` if the request is empty, has blank
    /// shipping fields, or asks for zero units of something.
    pub fn quantities(&self) -> Result<BTreeMap<ProductId, u32>, OrderRequestError> {
        if self.phone.trim().is_empty()
            || self.city.trim().is_empty()
            || self.location.trim().is_empty()
        {
            return Err(OrderRequestError::MissingShipping);
        }
        if self.products.is_empty() {
            return Err(OrderRequestError::Empty);
        }

        let mut quantities = BTreeMap::new();
        for line in &self.products {
            if line.quantity == 0 {
                return Err(OrderRequestError::ZeroQuantity);
            }
            let entry = quantities.entry(line.product_id).or_insert(0_u32);
            *entry = entry.saturating_add(line.quantity);
        }
        Ok(quantities)
    }
}
