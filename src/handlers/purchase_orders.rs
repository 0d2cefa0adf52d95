use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    entities::purchase_order::PurchaseOrderStatus,
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Optional body for the receive endpoint; the target status defaults to
/// `received` when omitted and must not be `pending`.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderRequest {
    pub status: Option<PurchaseOrderStatus>,
}

/// Run a replenishment pass and create purchase orders
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/replenish",
    responses(
        (status = 201, description = "Purchase orders created, one per supplier with low-stock items"),
        (status = 422, description = "No products below their minimum stock threshold")
    ),
    tag = "purchase-orders"
)]
pub async fn replenish(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .replenishment
        .create_purchase_orders()
        .await
        .map_err(map_service_error)?;

    info!(order_count = orders.len(), "replenishment pass complete");

    Ok(created_response(orders))
}

/// List purchase orders with items and products, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses(
        (status = 200, description = "All purchase orders, newest first")
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .replenishment
        .list_purchase_orders()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Get a purchase order by ID
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order fetched"),
        (status = 404, description = "Purchase order not found")
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .replenishment
        .get_purchase_order(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Mark a purchase order as received, reconciling stock levels
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    request_body = ReceivePurchaseOrderRequest,
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order received and stock incremented"),
        (status = 400, description = "Target status would leave the order pending"),
        (status = 404, description = "Purchase order not found"),
        (status = 409, description = "Purchase order already received")
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<ReceivePurchaseOrderRequest>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    validate_input(&request)?;

    let order = state
        .services
        .replenishment
        .receive_purchase_order(order_id, request.status)
        .await
        .map_err(map_service_error)?;

    info!(order_id = %order_id, "purchase order received");

    Ok(success_response(order))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders))
        .route("/replenish", post(replenish))
        .route("/:id", get(get_purchase_order))
        .route("/:id/receive", post(receive_purchase_order))
}
