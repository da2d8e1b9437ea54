//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: email registration with a one-time code, login
//! and logout.
//!
//! Registration is two-step. `register` parks the hashed user in the cache and
//! mails a code; `verify_email` turns the parked user into a real one and opens
//! the first session.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{ConnectInfo, State},
    http::{header, Extensions, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shop_core::domain::{NewSession, NewUser, User, UserLookup, UserRole};
use shop_core::ports::PortError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::extract::Caller;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

pub const PENDING_USER_TTL_SECONDS: u64 = 15 * 60;
pub const OTP_TTL_SECONDS: u64 = 5 * 60;
const OTP_DIGITS: usize = 6;
const MIN_PASSWORD_LEN: usize = 8;

pub fn pending_user_key(email: &str) -> String {
    format!("user:{}", email)
}

pub fn otp_key(email: &str) -> String {
    format!("otp-{}", email)
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The user together with a fresh access token.
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
}

//=========================================================================================
// Password & Code Helpers
//=========================================================================================

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("failed to hash password".to_string())
        })
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("stored password hash is invalid".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::BadRequest("email is invalid".to_string())),
    }
}

/// A zero-padded numeric one-time code.
pub fn generate_otp() -> String {
    let max = 10u32.pow(OTP_DIGITS as u32);
    format!("{:0width$}", rand::thread_rng().gen_range(0..max), width = OTP_DIGITS)
}

fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_default()
}

/// Opens a session for `user` and issues the matching token.
async fn open_session(
    state: &AppState,
    user: User,
    headers: &HeaderMap,
    extensions: &Extensions,
) -> Result<AuthResponse, ApiError> {
    let now = Utc::now();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let session = state
        .repos
        .sessions
        .create_session(NewSession {
            user_id: user.id,
            ip_address: client_ip(headers, extensions),
            user_agent,
            expires_at: state.tokens.expiry_from(now),
        })
        .await?;

    let access_token = state
        .tokens
        .issue(user.id, user.user_role, session.id, now)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(AuthResponse { user, access_token })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Start a registration and mail the verification code.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Verification code sent", body = MessageResponse),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (status = 409, description = "Email already registered", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&req.password)?;
    if req.first_name.trim().is_empty() {
        return Err(ApiError::BadRequest("first_name is required".to_string()));
    }

    match state.repos.users.get_user(UserLookup::Email(email.clone())).await {
        Ok(_) => return Err(ApiError::Conflict("user already exists".to_string())),
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let pending = NewUser {
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        email: email.clone(),
        password_hash: hash_password(&req.password)?,
        phone_number: req.phone_number.trim().to_string(),
        user_role: UserRole::User,
    };
    let payload =
        serde_json::to_string(&pending).map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .cache
        .set(&pending_user_key(&email), &payload, PENDING_USER_TTL_SECONDS)
        .await?;

    let otp = generate_otp();
    let otp_entry = otp_key(&email);
    tokio::try_join!(
        state.cache.set(&otp_entry, &otp, OTP_TTL_SECONDS),
        state.mailer.send_otp(&email, &otp),
    )?;

    info!(%email, "Registration pending email verification");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User registered successfully, please verify your email address",
        )),
    ))
}

/// Confirm the code, create the user and sign them in.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = AuthResponse),
        (status = 400, description = "Incorrect code", body = ErrorEnvelope),
        (status = 404, description = "Code or registration expired", body = ErrorEnvelope)
    )
)]
pub async fn verify_email_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let otp_entry = otp_key(&email);

    let expected = state
        .cache
        .get(&otp_entry)
        .await?
        .ok_or_else(|| ApiError::NotFound("otp expired or not found".to_string()))?;
    if expected != req.otp.trim() {
        return Err(ApiError::BadRequest("incorrect otp".to_string()));
    }

    let pending_entry = pending_user_key(&email);
    let payload = state
        .cache
        .get(&pending_entry)
        .await?
        .ok_or_else(|| ApiError::NotFound("pending registration not found".to_string()))?;
    let pending: NewUser =
        serde_json::from_str(&payload).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state.repos.users.create_user(pending).await?;
    state.cache.delete(&otp_entry).await?;
    state.cache.delete(&pending_entry).await?;
    info!(user_id = %user.id, "User verified and created");

    let response = open_session(&state, user, &headers, &extensions).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Login with email and password.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorEnvelope)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let credentials = match state.repos.users.get_credentials(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&req.password, &credentials.password_hash)? {
        return Err(invalid());
    }

    let response = open_session(&state, credentials.user, &headers, &extensions).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Logout and deactivate the current session.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "No active session", body = ErrorEnvelope)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    state
        .repos
        .sessions
        .deactivate_session(caller.session_id)
        .await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}
