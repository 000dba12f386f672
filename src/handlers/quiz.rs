// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quiz::QuizDefinition,
    services::{identity, quizzes, stats},
    state::AppState,
    utils::jwt::Claims,
};

/// Lists quizzes for the caller.
///
/// Admins get full records. Students get their own grade and group only,
/// with correct answers stripped.
pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let list = quizzes::list_quizzes(&state, &user).await?;

    if user.is_admin() {
        return Ok(Json(json!({ "quizzes": list })));
    }

    let now = state.clock.now();
    let public: Vec<_> = list.iter().map(|q| q.to_public(now)).collect();
    Ok(Json(json!({ "quizzes": public })))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let quiz = quizzes::get_quiz(&state, &user, id).await?;

    if user.is_admin() {
        Ok(Json(json!({ "quiz": quiz })))
    } else {
        Ok(Json(json!({ "quiz": quiz.to_public(state.clock.now()) })))
    }
}

/// Creates a quiz.
/// Admin only.
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(payload): Json<QuizDefinition>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::create_quiz(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "quiz": quiz }))))
}

/// Replaces a quiz definition.
/// Admin only.
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizDefinition>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::update_quiz(&state, id, payload).await?;
    Ok(Json(json!({ "quiz": quiz })))
}

/// Deletes a quiz. Attempts already taken stay on record.
/// Admin only.
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    quizzes::delete_quiz(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attempt statistics of one quiz.
/// Admin only.
pub async fn quiz_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stats = stats::quiz_stats(&state, id).await?;
    Ok(Json(json!({ "stats": stats })))
}
