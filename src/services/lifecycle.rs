// src/services/lifecycle.rs

//! Attempt lifecycle: `NotStarted -> InProgress -> Completed`.
//!
//! Starting is a check-and-create that the repository performs atomically per
//! (user, quiz); completing is a compare-and-swap on "still in progress", so a
//! manual submit racing the countdown's auto-submit completes exactly once.

use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Answers, NewAttempt, QuizAttempt},
        quiz::{Question, Quiz, answer_key},
        user::User,
    },
    services::scoring,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Quiz not found")]
    QuizNotFound,
    #[error("Quiz is closed or past its deadline")]
    QuizUnavailable,
    #[error("Quiz is not assigned to your grade and group")]
    ScopeMismatch,
    #[error("Maximum number of attempts ({0}) reached")]
    AttemptLimitExceeded(i32),
    #[error("Attempt not found")]
    AttemptNotFound,
    #[error("Attempt has already been submitted")]
    AlreadyCompleted,
    #[error("Attempt belongs to another user")]
    Forbidden,
    #[error("Invalid answers: {0}")]
    InvalidAnswers(String),
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AttemptError> for AppError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::QuizNotFound | AttemptError::AttemptNotFound => {
                AppError::NotFound(err.to_string())
            }
            AttemptError::QuizUnavailable
            | AttemptError::AttemptLimitExceeded(_)
            | AttemptError::AlreadyCompleted => AppError::Conflict(err.to_string()),
            AttemptError::ScopeMismatch | AttemptError::Forbidden => {
                AppError::Forbidden(err.to_string())
            }
            AttemptError::InvalidAnswers(_) => AppError::BadRequest(err.to_string()),
            AttemptError::Store(inner) => inner,
        }
    }
}

/// Starts a new attempt of `quiz_id` for `user`.
///
/// Preconditions are checked in this order: the quiz exists, it is open, it
/// is in the user's scope (admins skip this), and the attempt limit is not
/// reached. The limit check and the insert are one atomic step.
pub async fn start_attempt(
    state: &AppState,
    user: &User,
    quiz_id: Uuid,
) -> Result<QuizAttempt, AttemptError> {
    let quiz = state
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;

    let now = state.clock.now();
    if !quiz.is_open(now) {
        return Err(AttemptError::QuizUnavailable);
    }
    if !quiz.is_visible_to(user) {
        tracing::warn!("User {} tried to start out-of-scope quiz {}", user.id, quiz.id);
        return Err(AttemptError::ScopeMismatch);
    }

    let new_attempt = NewAttempt {
        user_id: user.id,
        quiz_id: quiz.id,
        total_questions: quiz.question_count(),
        started_at: now,
        expires_at: now + Duration::minutes(i64::from(quiz.duration_minutes)),
    };

    let attempt = state
        .attempts
        .create_attempt_within_limit(new_attempt, quiz.max_attempts)
        .await?
        .ok_or(AttemptError::AttemptLimitExceeded(quiz.max_attempts))?;

    tracing::info!(
        "User {} started attempt #{} ({}) of quiz {}",
        user.id,
        attempt.attempt_number,
        attempt.id,
        quiz.id
    );
    Ok(attempt)
}

/// Completes an in-progress attempt with the final answer map.
///
/// The submitted map replaces whatever was stored. Only the owner may
/// submit; admins have no exception. A second submission fails with
/// `AlreadyCompleted` and leaves the first result untouched.
pub async fn submit_attempt(
    state: &AppState,
    attempt_id: Uuid,
    answers: Answers,
    user: &User,
) -> Result<QuizAttempt, AttemptError> {
    let attempt = state
        .attempts
        .find_attempt(attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;

    if attempt.user_id != user.id {
        return Err(AttemptError::Forbidden);
    }
    if attempt.is_completed() {
        return Err(AttemptError::AlreadyCompleted);
    }

    let quiz = state
        .quizzes
        .find_quiz(attempt.quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;
    // Only the questions the attempt started with count, even if the quiz grew since.
    let snapshot = usize::try_from(attempt.total_questions).unwrap_or(0);
    let questions = &quiz.questions[..quiz.questions.len().min(snapshot)];
    check_answers(questions, &answers)?;

    let score = scoring::score(questions, &answers);
    let completed_at = state.clock.now();
    if completed_at > attempt.expires_at {
        tracing::warn!(
            "Attempt {} submitted {}s after it expired",
            attempt.id,
            (completed_at - attempt.expires_at).num_seconds()
        );
    }

    match state
        .attempts
        .complete_attempt(attempt_id, answers, score, completed_at)
        .await?
    {
        Some(completed) => {
            tracing::info!(
                "User {} completed attempt {} with score {}/{}",
                user.id,
                completed.id,
                score,
                completed.total_questions
            );
            Ok(completed)
        }
        // Lost the race: either completed by a concurrent submit or deleted meanwhile.
        None => match state.attempts.find_attempt(attempt_id).await? {
            Some(_) => Err(AttemptError::AlreadyCompleted),
            None => Err(AttemptError::AttemptNotFound),
        },
    }
}

/// Rejects keys that address no question and values outside a question's answer domain.
fn check_answers(questions: &[Question], answers: &Answers) -> Result<(), AttemptError> {
    for (key, value) in answers {
        let question = key
            .strip_prefix('q')
            .and_then(|index| index.parse::<usize>().ok())
            .filter(|index| answer_key(*index) == *key)
            .and_then(|index| questions.get(index))
            .ok_or_else(|| AttemptError::InvalidAnswers(format!("unknown question key '{}'", key)))?;

        if !question.accepts(value) {
            return Err(AttemptError::InvalidAnswers(format!(
                "'{}' is not a valid answer for {}",
                value, key
            )));
        }
    }
    Ok(())
}

/// The caller's attempts, newest first, optionally restricted to one quiz.
pub async fn list_attempts(
    state: &AppState,
    user: &User,
    quiz_id: Option<Uuid>,
) -> Result<Vec<QuizAttempt>, AppError> {
    state.attempts.list_user_attempts(user.id, quiz_id).await
}

/// An attempt with its quiz. The quiz is `None` when it has since been deleted.
pub async fn get_attempt(
    state: &AppState,
    user: &User,
    attempt_id: Uuid,
) -> Result<(QuizAttempt, Option<Quiz>), AttemptError> {
    let attempt = state
        .attempts
        .find_attempt(attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;

    if attempt.user_id != user.id && !user.is_admin() {
        return Err(AttemptError::Forbidden);
    }

    let quiz = state.quizzes.find_quiz(attempt.quiz_id).await?;
    Ok((attempt, quiz))
}

/// Administrative removal of an attempt by its owner or an admin.
pub async fn delete_attempt(
    state: &AppState,
    user: &User,
    attempt_id: Uuid,
) -> Result<(), AttemptError> {
    let attempt = state
        .attempts
        .find_attempt(attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;

    if attempt.user_id != user.id && !user.is_admin() {
        return Err(AttemptError::Forbidden);
    }

    if !state.attempts.delete_attempt(attempt_id).await? {
        return Err(AttemptError::AttemptNotFound);
    }
    tracing::info!("User {} deleted attempt {}", user.id, attempt_id);
    Ok(())
}
