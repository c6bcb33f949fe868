//! Shopping cart state for a single browsing session.
//!
//! The cart lives for as long as the shopper's page does. It holds
//! snapshots of the products that were added and builds the checkout
//! request body; the server re-reads prices at checkout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CreateOrderRequest, LineItemRequest, Price, Product, ProductId};

/// Errors from cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product is marked sold out.
    #[error("{0} is sold out")]
    SoldOut(String),

    /// Checkout was attempted with nothing in the cart.
    #[error("Your cart is empty")]
    Empty,

    /// Phone, city or location was left blank.
    #[error("Please fill in phone, city and location")]
    MissingShipping,
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub title: String,
    pub price: Price,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Shipping details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shipping {
    pub phone: String,
    pub city: String,
    pub location: String,
}

/// What the server said about a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The order was stored.
    Placed,
    /// Some products sold out in the meantime.
    SoldOut(Vec<String>),
    /// Any other failure.
    Failed(String),
}

/// A shopper's cart. Lines keep the order in which products were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::SoldOut` if the product is sold out.
    pub fn add(&mut self, product: &Product) -> Result<(), CartError> {
        if product.sold_out {
            return Err(CartError::SoldOut(product.title.clone()));
        }

        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                title: product.title.clone(),
                price: product.price,
                quantity: 1,
            });
        }
        Ok(())
    }

    /// Remove a product's line entirely. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    /// Set a line's quantity. Values below 1 are ignored.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity < 1 {
            return;
        }
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    pub fn increment(&mut self, product_id: ProductId) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_add(1);
        }
    }

    /// Decrease a line's quantity by one, never below 1.
    pub fn decrement(&mut self, product_id: ProductId) {
        if let Some(line) = self.line_mut(product_id)
            && line.quantity > 1
        {
            line.quantity -= 1;
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::total).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Build the body for `POST /api/orders`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Empty` for an empty cart and
    /// `CartError::MissingShipping` if any shipping field is blank.
    pub fn checkout_request(&self, shipping: &Shipping) -> Result<CreateOrderRequest, CartError> {
        if self.is_empty() {
            return Err(CartError::Empty);
        }
        let phone = shipping.phone.trim();
        let city = shipping.city.trim();
        let location = shipping.location.trim();
        if phone.is_empty() || city.is_empty() || location.is_empty() {
            return Err(CartError::MissingShipping);
        }

        Ok(CreateOrderRequest {
            products: self
                .lines
                .iter()
                .map(|line| LineItemRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            phone: phone.to_owned(),
            city: city.to_owned(),
            location: location.to_owned(),
        })
    }

    /// Update the cart after a checkout attempt.
    ///
    /// A placed order empties the cart. A sold-out rejection leaves the cart
    /// alone and returns the server's titles unchanged so they can be shown
    /// to the shopper. Other failures leave the cart alone and return nothing.
    pub fn apply_checkout_outcome(&mut self, outcome: CheckoutOutcome) -> Vec<String> {
        match outcome {
            CheckoutOutcome::Placed => {
                self.clear();
                Vec::new()
            }
            CheckoutOutcome::SoldOut(titles) => titles,
            CheckoutOutcome::Failed(_) => Vec::new(),
        }
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}
