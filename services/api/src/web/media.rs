//! services/api/src/web/media.rs
//!
//! Picture upload to the object store. The returned URL is what clients pass
//! to the product and post picture endpoints.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

/// Lower-cased extension of `file_name` with its leading dot, or empty.
pub(crate) fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub(crate) fn content_type_for(extension: &str) -> &'static str {
    match extension {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Upload one file from the `file` multipart field.
#[utoipa::path(
    post,
    path = "/v1/minio/media",
    tag = "media",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "A `file` part holding the picture."),
    responses(
        (status = 201, body = UploadResponse),
        (status = 400, description = "No file part", body = ErrorEnvelope),
        (status = 500, body = ErrorEnvelope)
    )
)]
pub async fn upload_media_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart data: {}", e);
        ApiError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let extension = extension_of(field.file_name().unwrap_or_default());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("file is empty".to_string()));
        }

        let key = format!("{}{}", Uuid::new_v4(), extension);
        let url = state
            .media
            .put_object(&key, data.to_vec(), content_type_for(&extension))
            .await?;
        info!(%key, size = data.len(), "Media uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(ApiError::BadRequest("file is required".to_string()))
}
