//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products              - List products (public)
//! POST   /api/products              - Create product, multipart (owner)
//! PUT    /api/products/{id}         - Toggle sold-out (owner)
//! DELETE /api/products/{id}         - Delete product and image (owner)
//!
//! # Orders
//! GET    /api/orders                - List orders (owner)
//! POST   /api/orders                - Checkout (public)
//! DELETE /api/orders                - Delete every order (owner)
//! PUT    /api/orders/{id}           - Change state (owner)
//! DELETE /api/orders/{id}           - Delete one order (owner)
//!
//! # Contact
//! POST   /api/contact               - Contact form (public)
//!
//! # Dashboard (owner)
//! GET    /api/superadmin/analytics
//! GET    /api/superadmin/orders
//! GET    /api/superadmin/products
//! GET    /api/superadmin/contacts
//!
//! # Auth
//! POST   /api/register              - First (and only) owner account
//! POST   /api/login                 - Issue a bearer token
//! GET    /api/auth/check-signup     - Is registration open
//! GET    /api/auth/verify           - Check a bearer token
//!
//! # Security
//! POST   /api/security/log          - Client-reported suspicious activity
//! ```

pub mod auth;
pub mod contact;
pub mod orders;
pub mod products;
pub mod security;
pub mod superadmin;

use std::str::FromStr;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest},
    routing::{get, post, put},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// JSON body extractor whose rejections are JSON `AppError`s.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Plain `{"message": ...}` success body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Parse a path ID, answering 400 with a readable message on garbage.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {what} id")))
}

/// Create the product routes router.
pub fn product_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(products::index)
                .post(products::create)
                .layer(DefaultBodyLimit::max(
                    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
                )),
        )
        .route("/{id}", put(products::update).delete(products::destroy))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(orders::index)
                .post(orders::create)
                .delete(orders::destroy_all),
        )
        .route("/{id}", put(orders::update).delete(orders::destroy))
}

/// Create the dashboard routes router.
pub fn superadmin_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(superadmin::analytics))
        .route("/orders", get(superadmin::orders))
        .route("/products", get(superadmin::products))
        .route("/contacts", get(superadmin::contacts))
}

/// Create all `/api` routes.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes(max_upload_bytes))
        .nest("/orders", order_routes())
        .route("/contact", post(contact::create))
        .nest("/superadmin", superadmin_routes())
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/auth/check-signup", get(auth::check_signup))
        .route("/auth/verify", get(auth::verify))
        .route("/security/log", post(security::log))
}
