//! services/api/src/web/basket.rs
//!
//! The caller's shopping basket. Every handler works on the basket of the
//! authenticated user; admins may clear someone else's with `user_id`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::domain::{BasketSelector, BasketSummary, BasketView};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::extract::Caller;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_count")]
    pub count: i32,
}

fn default_count() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeleteItemQuery {
    pub basket_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ClearBasketQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[utoipa::path(
    post,
    path = "/v1/basket/item",
    tag = "basket",
    security(("bearer_auth" = [])),
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Item added; the updated basket summary", body = BasketSummary),
        (status = 400, body = ErrorEnvelope),
        (status = 404, description = "Product not found", body = ErrorEnvelope)
    )
)]
pub async fn add_item_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .repos
        .basket
        .add_item(caller.user_id, req.product_id, req.count)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Remove one pending line from the caller's basket.
#[utoipa::path(
    delete,
    path = "/v1/basket/item",
    tag = "basket",
    security(("bearer_auth" = [])),
    params(DeleteItemQuery),
    responses(
        (status = 200, body = DeletedResponse),
        (status = 400, description = "basket_id missing", body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn delete_item_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<DeleteItemQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let selector = BasketSelector::from_parts(query.basket_id, None)?;
    if let BasketSelector::Item(item_id) = selector {
        let basket = state.repos.basket.get_basket(caller.user_id).await?;
        if !basket.items.iter().any(|line| line.id == item_id) {
            return Err(ApiError::NotFound("basket item not found".to_string()));
        }
    }
    let deleted = state.repos.basket.delete_basket(selector).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// Empty a basket. Defaults to the caller's own.
#[utoipa::path(
    delete,
    path = "/v1/basket",
    tag = "basket",
    security(("bearer_auth" = [])),
    params(ClearBasketQuery),
    responses(
        (status = 200, body = DeletedResponse),
        (status = 403, body = ErrorEnvelope)
    )
)]
pub async fn clear_basket_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<ClearBasketQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let user_id = query.user_id.unwrap_or(caller.user_id);
    caller.ensure_can_act_for(user_id)?;
    let deleted = state
        .repos
        .basket
        .delete_basket(BasketSelector::User(user_id))
        .await?;
    info!(%user_id, deleted, "Basket cleared");
    Ok(Json(DeletedResponse { deleted }))
}

#[utoipa::path(
    get,
    path = "/v1/basket/get",
    tag = "basket",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Pending lines; empty when nothing was added", body = BasketView))
)]
pub async fn get_basket_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<BasketView>, ApiError> {
    Ok(Json(state.repos.basket.get_basket(caller.user_id).await?))
}
