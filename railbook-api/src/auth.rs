use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use railbook_core::store::{StoreError, UserStore};

use crate::error::AppError;
use crate::middleware::auth::{CustomerClaims, CUSTOMER_ROLE};
use crate::password::{hash_password, verify_password};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    id: Uuid,
    username: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let hash = hash_password(&req.password);
    let user = state
        .store
        .create_user(req.username.trim(), &hash)
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::Conflict("Username already exists".to_string()),
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        })?;

    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .store
        .user_by_username(req.username.trim())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // One rejection path for both unknown user and bad password.
    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        _ => return Err(AppError::Authentication("Invalid credentials".to_string())),
    };

    let claims = CustomerClaims {
        sub: user.id.to_string(),
        username: user.username,
        role: CUSTOMER_ROLE.to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

    Ok(Json(AuthResponse { token }))
}
