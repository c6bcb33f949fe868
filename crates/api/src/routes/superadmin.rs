//! Owner dashboard route handlers.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use souk_core::dashboard::{
    DashboardSummary, MonthlyRevenue, RevenueFormula, monthly_revenue, revenue_in_state,
};
use souk_core::{Contact, Order, OrderState, Price, Product};

use crate::db::{ContactRepository, OrderRepository};
use crate::error::Result;
use crate::middleware::RequireOwner;
use crate::state::AppState;

/// Months of Delivered revenue in the analytics payload.
const REVENUE_MONTHS: usize = 12;
/// Rows in each "recent" list.
const RECENT_LIMIT: usize = 10;
const RECENT_CONTACTS: i64 = 10;

/// Headline counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_products: usize,
    pub total_orders: usize,
    pub pending_orders: usize,
    pub delivered_orders: usize,
    pub total_contacts: i64,
    /// Revenue of Delivered orders.
    pub total_revenue: Price,
}

/// Body of `GET /api/superadmin/analytics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub stats: Stats,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub recent_orders: Vec<Order>,
    pub recent_products: Vec<Product>,
    pub recent_contacts: Vec<Contact>,
    pub summary: DashboardSummary,
}

fn count_in(orders: &[Order], state: OrderState) -> usize {
    orders.iter().filter(|o| o.state == state).count()
}

/// Build the analytics payload from full order and product lists (newest
/// first) plus the contact total and most recent contacts.
#[must_use]
pub fn build_analytics(
    orders: &[Order],
    products: &[Product],
    total_contacts: i64,
    recent_contacts: Vec<Contact>,
) -> Analytics {
    let formula = RevenueFormula::default();

    Analytics {
        stats: Stats {
            total_products: products.len(),
            total_orders: orders.len(),
            pending_orders: count_in(orders, OrderState::Pending),
            delivered_orders: count_in(orders, OrderState::Delivered),
            total_contacts,
            total_revenue: revenue_in_state(orders, OrderState::Delivered, formula),
        },
        monthly_revenue: monthly_revenue(orders, OrderState::Delivered, formula, REVENUE_MONTHS),
        recent_orders: orders.iter().take(RECENT_LIMIT).cloned().collect(),
        recent_products: products.iter().take(RECENT_LIMIT).cloned().collect(),
        recent_contacts,
        summary: DashboardSummary::with_formula(
            orders,
            products,
            Utc::now().date_naive(),
            formula,
        ),
    }
}

/// GET /api/superadmin/analytics
#[instrument(skip(state))]
pub async fn analytics(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Analytics>> {
    let orders_repo = OrderRepository::new(state.pool());
    let contacts_repo = ContactRepository::new(state.pool());

    let (orders, products, total_contacts, recent_contacts) = tokio::try_join!(
        orders_repo.list(),
        state.products(),
        contacts_repo.count(),
        contacts_repo.list(Some(RECENT_CONTACTS)),
    )?;

    Ok(Json(build_analytics(
        &orders,
        &products,
        total_contacts,
        recent_contacts,
    )))
}

/// GET /api/superadmin/orders
#[instrument(skip(state))]
pub async fn orders(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderRepository::new(state.pool()).list().await?))
}

/// GET /api/superadmin/products
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Vec<Product>>> {
    let products = state.products().await?;
    Ok(Json(products.as_ref().clone()))
}

/// GET /api/superadmin/contacts
#[instrument(skip(state))]
pub async fn contacts(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(ContactRepository::new(state.pool()).list(None).await?))
}
