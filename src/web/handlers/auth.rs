//! Account registration and login handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{NewUser, UserRepository};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::FiledropError;

/// Minimum username length.
const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::bad_request(
            "Username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// POST /api/auth/register - Create a new account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    validate_username(&req.username)?;

    let password_hash = hash_password(&req.password).map_err(|e| match e {
        PasswordError::TooShort | PasswordError::TooLong => ApiError::bad_request(e.to_string()),
        _ => {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal("Failed to create account")
        }
    })?;

    let user = UserRepository::new(state.db.pool())
        .create(&NewUser {
            username: req.username,
            password: password_hash,
        })
        .await
        .map_err(|e| match e {
            FiledropError::InvalidInput(msg) => ApiError::conflict(msg),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    // Unknown user and wrong password are deliberately indistinguishable.
    let user = UserRepository::new(state.db.pool())
        .get_by_username(&req.username)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;

    let access_token = state.generate_access_token(user.id, &user.username)?;

    Ok(Json(LoginResponse {
        access_token,
        expires_in: state.access_token_expiry,
        user: UserInfo {
            id: user.id,
            username: user.username,
        },
    }))
}
