// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, RegisterRequest},
    services::identity,
    state::AppState,
    utils::jwt::{Claims, sign_jwt},
};

/// Registers a new student.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = identity::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// Authenticates a user and returns a JWT token.
///
/// The token carries the user's ID and role.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = identity::authenticate(&state, &payload.email, &payload.password).await?;

    let token = sign_jwt(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user
    })))
}

/// The signed-in user's profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    Ok(Json(json!({ "user": user })))
}
