//! services/api/src/web/post.rs
//!
//! Editorial posts. Reads are public, writes are admin-only per policy.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shop_core::domain::{NewPost, PictureLink, Post, PostFilter, PostList, PostPatch, Pagination};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub picture_url: Option<String>,
}

/// `PUT /post` names the post in the body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostPictureRequest {
    pub post_id: Uuid,
    pub picture_url: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PostListQuery {
    pub title: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/v1/post",
    tag = "post",
    security(("bearer_auth" = [])),
    request_body = CreatePostRequest,
    responses((status = 201, body = Post), (status = 400, body = ErrorEnvelope))
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .repos
        .posts
        .create_post(NewPost {
            title: req.title,
            content: req.content,
            picture_url: req.picture_url.filter(|u| !u.trim().is_empty()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/v1/post/{id}",
    tag = "post",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, body = Post), (status = 404, body = ErrorEnvelope))
)]
pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.repos.posts.get_post(post_id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/post/list",
    tag = "post",
    params(PostListQuery),
    responses((status = 200, body = PostList))
)]
pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PostList>, ApiError> {
    let filter = PostFilter {
        title: query.title.filter(|t| !t.trim().is_empty()),
        created_from: query.created_from,
        created_to: query.created_to,
        pagination: Pagination::new(query.page, query.limit),
    };
    Ok(Json(state.repos.posts.list_posts(filter).await?))
}

#[utoipa::path(
    put,
    path = "/v1/post",
    tag = "post",
    security(("bearer_auth" = [])),
    request_body = UpdatePostRequest,
    responses((status = 200, body = Post), (status = 404, body = ErrorEnvelope))
)]
pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let patch = PostPatch {
        title: req.title,
        content: req.content,
    };
    Ok(Json(state.repos.posts.update_post(req.id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/post/{id}",
    tag = "post",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repos.posts.delete_post(post_id).await?;
    Ok(Json(MessageResponse::new("Post deleted")))
}

#[utoipa::path(
    post,
    path = "/v1/post/picture",
    tag = "post",
    security(("bearer_auth" = [])),
    request_body = PostPictureRequest,
    responses((status = 201, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn add_post_picture_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostPictureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.picture_url.trim().is_empty() {
        return Err(ApiError::BadRequest("picture_url is required".to_string()));
    }
    state
        .repos
        .posts
        .add_post_picture(PictureLink {
            owner_id: req.post_id,
            picture_url: req.picture_url,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Picture added"))))
}

#[utoipa::path(
    delete,
    path = "/v1/post/picture",
    tag = "post",
    security(("bearer_auth" = [])),
    request_body = PostPictureRequest,
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorEnvelope))
)]
pub async fn delete_post_picture_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostPictureRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .repos
        .posts
        .delete_post_picture(PictureLink {
            owner_id: req.post_id,
            picture_url: req.picture_url,
        })
        .await?;
    Ok(Json(MessageResponse::new("Picture deleted")))
}
