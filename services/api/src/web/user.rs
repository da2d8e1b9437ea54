//! services/api/src/web/user.rs
//!
//! Profile endpoints. Users may read, update and delete themselves; admins may
//! read and delete anyone.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shop_core::domain::{User, UserLookup, UserPatch};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::auth::{hash_password, validate_email, validate_password};
use crate::web::extract::Caller;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    fn into_patch(self) -> Result<UserPatch, ApiError> {
        let email = match self.email {
            Some(email) => {
                let email = email.trim().to_lowercase();
                validate_email(&email)?;
                Some(email)
            }
            None => None,
        };
        let password_hash = match self.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };
        Ok(UserPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            phone_number: self.phone_number,
            password_hash,
        })
    }
}

#[utoipa::path(
    get,
    path = "/v1/user/{id}",
    tag = "user",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, body = User),
        (status = 403, description = "Not your account", body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    caller.ensure_can_act_for(user_id)?;
    let user = state.repos.users.get_user(UserLookup::Id(user_id)).await?;
    Ok(Json(user))
}

/// Sparse update of the caller's own profile.
#[utoipa::path(
    put,
    path = "/v1/user",
    tag = "user",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = User),
        (status = 400, description = "Nothing to update", body = ErrorEnvelope),
        (status = 409, description = "Email taken", body = ErrorEnvelope)
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let patch = req.into_patch()?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }
    let user = state.repos.users.update_user(caller.user_id, patch).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/v1/user/{id}",
    tag = "user",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    caller.ensure_can_act_for(user_id)?;
    state.repos.users.delete_user(user_id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}
