//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use souk_core::{CreateOrderRequest, Order, OrderId, OrderState};

use super::{JsonBody, MessageResponse, parse_id};
use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::state::AppState;

/// Response carrying an order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: Order,
}

/// Body of `PUT /api/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrder {
    #[serde(default)]
    pub state: String,
}

/// Response for clearing every order.
#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub message: &'static str,
    pub deleted: u64,
}

/// List every order, newest first.
///
/// GET /api/orders
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    Ok(Json(orders))
}

/// Place an order.
///
/// Sold-out products are rejected with 400 and their titles in
/// `soldOutProducts`.
///
/// POST /api/orders
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let order = OrderRepository::new(state.pool()).place(&request).await?;
    tracing::info!(order_id = %order.id, items = order.items.len(), "Order placed");

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order placed successfully",
            order,
        }),
    ))
}

/// Move an order to another state.
///
/// PUT /api/orders/{id}
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateOrder>,
) -> Result<Json<OrderResponse>> {
    let id: OrderId = parse_id(&id, "order")?;
    let new_state: OrderState = body
        .state
        .parse()
        .map_err(|e: souk_core::OrderStateError| AppError::BadRequest(e.to_string()))?;

    let order = OrderRepository::new(state.pool())
        .set_state(id, new_state)
        .await
        .map_err(not_found)?;
    tracing::info!(order_id = %id, state = %new_state, "Order state changed");

    Ok(Json(OrderResponse {
        message: "Order state updated successfully",
        order,
    }))
}

/// Delete one order.
///
/// DELETE /api/orders/{id}
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id: OrderId = parse_id(&id, "order")?;
    OrderRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found)?;
    tracing::info!(order_id = %id, "Order deleted");

    Ok(Json(MessageResponse::new("Order deleted successfully")))
}

/// Delete every order.
///
/// DELETE /api/orders
#[instrument(skip(state))]
pub async fn destroy_all(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<ClearedResponse>> {
    let deleted = OrderRepository::new(state.pool()).delete_all().await?;
    tracing::warn!(deleted, "All orders cleared");

    Ok(Json(ClearedResponse {
        message: "All orders cleared successfully",
        deleted,
    }))
}

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Order not found".to_string()),
        other => other.into(),
    }
}
