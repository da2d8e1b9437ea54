//! services/api/src/web/category.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shop_core::domain::{Category, CategoryFilter, CategoryList, Pagination};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CategoryListQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/v1/category",
    tag = "category",
    security(("bearer_auth" = [])),
    request_body = CategoryRequest,
    responses((status = 201, body = Category), (status = 400, body = ErrorEnvelope))
)]
pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.repos.categories.create_category(&req.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/v1/category/{id}",
    tag = "category",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, body = Category), (status = 404, body = ErrorEnvelope))
)]
pub async fn get_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.repos.categories.get_category(category_id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/category/list",
    tag = "category",
    params(CategoryListQuery),
    responses((status = 200, body = CategoryList))
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<CategoryList>, ApiError> {
    let filter = CategoryFilter {
        name: query.name.filter(|n| !n.trim().is_empty()),
        pagination: Pagination::new(query.page, query.limit),
    };
    Ok(Json(state.repos.categories.list_categories(filter).await?))
}

#[utoipa::path(
    put,
    path = "/v1/category/{id}",
    tag = "category",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, body = Category),
        (status = 400, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn update_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .repos
        .categories
        .update_category(category_id, &req.name)
        .await?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/v1/category/{id}",
    tag = "category",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repos.categories.delete_category(category_id).await?;
    Ok(Json(MessageResponse::new("Category deleted")))
}
