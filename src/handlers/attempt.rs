// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::attempt::{AttemptListParams, AttemptView, StartAttemptRequest, SubmitAttemptRequest},
    services::{identity, lifecycle},
    state::AppState,
    utils::jwt::Claims,
};

/// Starts a new attempt for the caller.
///
/// The attempt number is assigned by the server. Returns 201 Created.
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let attempt = lifecycle::start_attempt(&state, &user, payload.quiz_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "attempt": AttemptView::from(attempt) })),
    ))
}

/// Submits the final answers and scores the attempt.
///
/// * Only the owner may submit.
/// * A completed attempt cannot be submitted again (409).
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let attempt = lifecycle::submit_attempt(&state, id, payload.answers, &user).await?;
    Ok(Json(json!({ "attempt": AttemptView::from(attempt) })))
}

/// The caller's attempts, newest first. `?quiz_id=` narrows to one quiz.
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let attempts: Vec<AttemptView> = lifecycle::list_attempts(&state, &user, params.quiz_id)
        .await?
        .into_iter()
        .map(AttemptView::from)
        .collect();
    Ok(Json(json!({ "attempts": attempts })))
}

/// One attempt with its quiz. `quiz` is null if the quiz was deleted.
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    let (attempt, quiz) = lifecycle::get_attempt(&state, &user, id).await?;

    let quiz = match quiz {
        Some(quiz) if user.is_admin() => json!(quiz),
        Some(quiz) => json!(quiz.to_public(state.clock.now())),
        None => serde_json::Value::Null,
    };

    Ok(Json(json!({
        "attempt": AttemptView::from(attempt),
        "quiz": quiz
    })))
}

pub async fn delete_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity::current_user(&state, &claims).await?;
    lifecycle::delete_attempt(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
