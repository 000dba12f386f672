// src/services/quizzes.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::{Quiz, QuizDefinition},
        user::User,
    },
    repository::QuizScope,
    state::AppState,
};

/// Quizzes visible to `user`: everything for admins, the user's own grade
/// and group for students. A student without a grade or group sees nothing.
pub async fn list_quizzes(state: &AppState, user: &User) -> Result<Vec<Quiz>, AppError> {
    if user.is_admin() {
        return state.quizzes.list_quizzes(QuizScope::All).await;
    }

    match (user.grade.as_deref(), user.group.as_deref()) {
        (Some(grade), Some(group)) => {
            state
                .quizzes
                .list_quizzes(QuizScope::Class { grade, group })
                .await
        }
        _ => Ok(Vec::new()),
    }
}

/// Fetches a quiz the user is allowed to see.
pub async fn get_quiz(state: &AppState, user: &User, id: Uuid) -> Result<Quiz, AppError> {
    let quiz = state
        .quizzes
        .find_quiz(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    if !quiz.is_visible_to(user) {
        return Err(AppError::Forbidden(
            "Quiz is not assigned to your grade and group".to_string(),
        ));
    }
    Ok(quiz)
}

pub async fn create_quiz(state: &AppState, def: QuizDefinition) -> Result<Quiz, AppError> {
    def.validate()?;
    let quiz = state.quizzes.insert_quiz(def, state.clock.now()).await?;
    tracing::info!(
        "Created quiz {} ({} questions, {} attempts allowed)",
        quiz.id,
        quiz.questions.len(),
        quiz.max_attempts
    );
    Ok(quiz)
}

pub async fn update_quiz(state: &AppState, id: Uuid, def: QuizDefinition) -> Result<Quiz, AppError> {
    def.validate()?;
    let quiz = state
        .quizzes
        .replace_quiz(id, def)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
    tracing::info!("Updated quiz {}", quiz.id);
    Ok(quiz)
}

/// Deletes the quiz. Its attempts are kept.
pub async fn delete_quiz(state: &AppState, id: Uuid) -> Result<(), AppError> {
    if !state.quizzes.delete_quiz(id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tracing::info!("Deleted quiz {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_admin, definition, register_student, test_state};

    #[tokio::test]
    async fn test_students_only_see_their_scope() {
        let state = test_state();
        let admin = create_admin(&state).await;
        let student = register_student(&state, "ana@example.com", "grade-1", "group-a").await;

        let own = create_quiz(&state, definition("grade-1", "group-a", 1)).await.unwrap();
        let other = create_quiz(&state, definition("grade-2", "group-b", 1)).await.unwrap();

        let listed = list_quizzes(&state, &student).await.unwrap();
        assert_eq!(listed.iter().map(|q| q.id).collect::<Vec<_>>(), vec![own.id]);

        let all = list_quizzes(&state, &admin).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|q| q.id == other.id));
    }

    #[tokio::test]
    async fn test_get_quiz_outside_scope_is_forbidden() {
        let state = test_state();
        let student = register_student(&state, "ana@example.com", "grade-1", "group-a").await;
        let other = create_quiz(&state, definition("grade-2", "group-b", 1)).await.unwrap();

        let err = get_quiz(&state, &student, other.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_invalid_definition_is_rejected() {
        let state = test_state();
        let mut def = definition("grade-1", "group-a", 1);
        def.questions.clear();

        let err = create_quiz(&state, def).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("questions")));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_quiz() {
        let state = test_state();
        let missing = Uuid::new_v4();

        let err = update_quiz(&state, missing, definition("grade-1", "group-a", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(delete_quiz(&state, missing).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let state = test_state();
        let quiz = create_quiz(&state, definition("grade-1", "group-a", 1)).await.unwrap();

        let mut def = definition("grade-1", "group-a", 3);
        def.title = "Renamed".to_string();
        def.questions.truncate(1);
        let updated = update_quiz(&state, quiz.id, def).await.unwrap();

        assert_eq!(updated.id, quiz.id);
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.max_attempts, 3);
        assert_eq!(updated.questions.len(), 1);
        assert_eq!(updated.created_at, quiz.created_at);
    }
}
