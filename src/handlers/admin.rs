// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::UserChanges,
    services::{identity, stats},
    state::AppState,
    utils::jwt::Claims,
};

/// Portal-wide dashboard figures.
/// Admin only.
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let overview = stats::admin_overview(&state).await?;
    Ok(Json(json!({ "stats": overview })))
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(json!({ "users": users })))
}

/// Updates name, role, grade or group of a user. Absent fields are left alone.
/// Admin only.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserChanges>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::update_user(&state, id, payload).await?;
    Ok(Json(json!({ "user": user })))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let acting = identity::current_user(&state, &claims).await?;
    identity::delete_user(&state, &acting, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
