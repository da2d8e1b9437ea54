//! services/api/src/web/product.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shop_core::domain::{
    NewProduct, Pagination, PictureLink, Product, ProductFilter, ProductList, ProductPatch,
};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductListQuery {
    pub title: Option<String>,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    pub category_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductListQuery {
    fn into_filter(self) -> ProductFilter {
        ProductFilter {
            pagination: Pagination::new(self.page, self.limit),
            title: self.title.filter(|t| !t.trim().is_empty()),
            price_from: self.price_from,
            price_to: self.price_to,
            category_id: self.category_id,
            product_type: self.product_type.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductPictureRequest {
    pub product_id: Uuid,
    pub picture_url: String,
}

impl From<ProductPictureRequest> for PictureLink {
    fn from(req: ProductPictureRequest) -> Self {
        PictureLink {
            owner_id: req.product_id,
            picture_url: req.picture_url,
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/product",
    tag = "product",
    security(("bearer_auth" = [])),
    request_body = NewProduct,
    responses(
        (status = 201, body = Product),
        (status = 400, body = ErrorEnvelope),
        (status = 404, description = "Category not found", body = ErrorEnvelope)
    )
)]
pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.repos.products.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/v1/product/{id}",
    tag = "product",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, body = Product), (status = 404, body = ErrorEnvelope))
)]
pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.repos.products.get_product(product_id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/product/list",
    tag = "product",
    params(ProductListQuery),
    responses((status = 200, body = ProductList))
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductList>, ApiError> {
    let list = state.repos.products.list_products(query.into_filter()).await?;
    Ok(Json(list))
}

/// Sparse update. Changing `price` or `sale_price` re-prices open baskets.
#[utoipa::path(
    put,
    path = "/v1/product/{id}",
    tag = "product",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductPatch,
    responses(
        (status = 200, body = Product),
        (status = 400, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    let product = state.repos.products.update_product(product_id, patch).await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/v1/product/{id}",
    tag = "product",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repos.products.delete_product(product_id).await?;
    Ok(Json(MessageResponse::new("Product deleted")))
}

#[utoipa::path(
    post,
    path = "/v1/product/picture",
    tag = "product",
    security(("bearer_auth" = [])),
    request_body = ProductPictureRequest,
    responses((status = 201, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn add_product_picture_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProductPictureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.picture_url.trim().is_empty() {
        return Err(ApiError::BadRequest("picture_url is required".to_string()));
    }
    state.repos.products.add_picture(req.into()).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Picture added"))))
}

#[utoipa::path(
    delete,
    path = "/v1/product/picture",
    tag = "product",
    security(("bearer_auth" = [])),
    request_body = ProductPictureRequest,
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn delete_product_picture_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProductPictureRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repos.products.delete_picture(req.into()).await?;
    Ok(Json(MessageResponse::new("Picture deleted")))
}
