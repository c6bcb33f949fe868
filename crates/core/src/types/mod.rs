//! Core types for Souk.
//!
//! This module provides type-safe wrappers and records for the storefront's
//! domain concepts.

pub mod contact;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod username;

pub use contact::{Contact, ContactError, NewContact, ValidContact};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{CreateOrderRequest, LineItem, LineItemRequest, Order, OrderRequestError};
pub use price::{Price, PriceError};
pub use product::Product;
pub use status::{OrderState, OrderStateError};
pub use username::{Username, UsernameError};
