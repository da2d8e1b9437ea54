//! services/api/src/web/order.rs
//!
//! Placing and inspecting orders. Customers only see their own orders;
//! editing an order is reserved to admins by the policy table.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shop_core::domain::{
    Order, OrderFilter, OrderList, OrderPatch, OrderProduct, OrderStatus, Pagination,
};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::extract::Caller;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub quantity: Option<i32>,
    pub total_price: Option<f64>,
    pub status: Option<OrderStatus>,
}

impl UpdateOrderRequest {
    fn into_parts(self) -> (Uuid, OrderPatch) {
        (
            self.id,
            OrderPatch {
                order_type: self.order_type,
                quantity: self.quantity,
                total_price: self.total_price,
                status: self.status,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListQuery {
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    /// Admins may list another user's orders.
    pub user_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderProductsQuery {
    pub order_id: Uuid,
}

async fn owned_order(state: &AppState, caller: &Caller, order_id: Uuid) -> Result<Order, ApiError> {
    let order = state.repos.orders.get_order(order_id).await?;
    caller.ensure_can_act_for(order.user_id)?;
    Ok(order)
}

/// Turn the caller's pending basket into an order.
#[utoipa::path(
    post,
    path = "/v1/order",
    tag = "order",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = Order),
        (status = 400, description = "Basket is empty", body = ErrorEnvelope)
    )
)]
pub async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.repos.orders.create_order(caller.user_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    put,
    path = "/v1/order",
    tag = "order",
    security(("bearer_auth" = [])),
    request_body = UpdateOrderRequest,
    responses((status = 200, body = Order), (status = 404, body = ErrorEnvelope))
)]
pub async fn update_order_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let (order_id, patch) = req.into_parts();
    Ok(Json(state.repos.orders.update_order(order_id, patch).await?))
}

#[utoipa::path(
    get,
    path = "/v1/order/{id}",
    tag = "order",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, body = Order),
        (status = 403, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(owned_order(&state, &caller, order_id).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/order/{id}",
    tag = "order",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn delete_order_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(order_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    owned_order(&state, &caller, order_id).await?;
    state.repos.orders.delete_order(order_id).await?;
    Ok(Json(MessageResponse::new("Order deleted")))
}

/// Newest first.
#[utoipa::path(
    get,
    path = "/v1/order/list",
    tag = "order",
    security(("bearer_auth" = [])),
    params(OrderListQuery),
    responses((status = 200, body = OrderList), (status = 403, body = ErrorEnvelope))
)]
pub async fn list_orders_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderList>, ApiError> {
    let user_id = query.user_id.unwrap_or(caller.user_id);
    caller.ensure_can_act_for(user_id)?;
    let filter = OrderFilter {
        user_id,
        order_type: query.order_type.filter(|t| !t.trim().is_empty()),
        pagination: Pagination::new(query.page, query.limit),
    };
    Ok(Json(state.repos.orders.list_orders(filter).await?))
}

#[utoipa::path(
    get,
    path = "/v1/order/products",
    tag = "order",
    security(("bearer_auth" = [])),
    params(OrderProductsQuery),
    responses(
        (status = 200, body = Vec<OrderProduct>),
        (status = 403, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn order_products_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<OrderProductsQuery>,
) -> Result<Json<Vec<OrderProduct>>, ApiError> {
    owned_order(&state, &caller, query.order_id).await?;
    Ok(Json(state.repos.orders.order_products(query.order_id).await?))
}
