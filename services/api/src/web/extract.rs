//! services/api/src/web/extract.rs
//!
//! Request extractors shared by the handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use shop_core::domain::UserRole;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthContext;

/// An authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on any user; everyone else only on themselves.
    pub fn ensure_can_act_for(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("access denied".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<AuthContext>()
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
        match (context.role, context.user_id, context.session_id) {
            (UserRole::Unauthorized, _, _) | (_, None, _) | (_, _, None) => {
                Err(ApiError::Unauthorized("Unauthorized".to_string()))
            }
            (role, Some(user_id), Some(session_id)) => Ok(Caller {
                user_id,
                session_id,
                role,
            }),
        }
    }
}
