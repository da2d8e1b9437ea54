//! services/api/src/web/middleware.rs
//!
//! Authentication and authorization middleware applied to every `/v1` route.
//!
//! The caller's role comes from the bearer token; tokens that are absent,
//! malformed or name an unknown role leave the caller `unauthorized`. A
//! verified token must point at a live session. The resulting role is then
//! checked against the policy table for the matched route template.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use shop_core::domain::UserRole;
use shop_core::ports::PortError;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Session id header some clients send alongside the token.
pub const SESSION_HEADER: &str = "session_id";

/// Identity established for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub role: UserRole,
    pub user_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            role: UserRole::Unauthorized,
            user_id: None,
            session_id: None,
        }
    }
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(&state, req.headers()).await?;

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().as_str().to_string();

    if !state.policy.enforce(context.role, &path, &method) {
        debug!(role = %context.role, %path, %method, "Request denied by policy");
        return Err(ApiError::Forbidden("access denied".to_string()));
    }

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let Some(raw) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(AuthContext::anonymous());
    };

    let claims = match state.tokens.verify(raw) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Ignoring unverifiable token: {}", e);
            return Ok(AuthContext::anonymous());
        }
    };
    let role = match claims.role() {
        Some(UserRole::Unauthorized) | None => return Ok(AuthContext::anonymous()),
        Some(role) => role,
    };

    if let Some(header_session) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        if header_session.trim() != claims.session_id.to_string() {
            return Err(ApiError::Unauthorized("session mismatch".to_string()));
        }
    }

    let session = match state.repos.sessions.get_session(claims.session_id).await {
        Ok(session) => session,
        Err(PortError::NotFound(_)) => {
            return Err(ApiError::Unauthorized("session not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    if session.user_id != claims.sub || !session.is_usable_at(Utc::now()) {
        return Err(ApiError::Unauthorized("session is not active".to_string()));
    }

    Ok(AuthContext {
        role,
        user_id: Some(claims.sub),
        session_id: Some(session.id),
    })
}
