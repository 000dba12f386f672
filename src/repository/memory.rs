// src/repository/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Answers, AttemptStatus, NewAttempt, QuizAttempt},
        quiz::{Quiz, QuizDefinition},
        user::{NewUser, User, UserChanges},
    },
};

use super::{AttemptRepository, QuizRepository, QuizScope, UserRepository};

/// Process-local store. Records live in insertion order; every
/// check-and-write happens under a single write guard.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    quizzes: RwLock<Vec<Quiz>>,
    attempts: RwLock<Vec<QuizAttempt>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password,
            role: user.role,
            grade: user.grade,
            group: user.group,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.users.read().await.clone();
        users.reverse();
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(grade) = changes.grade {
            user.grade = Some(grade);
        }
        if let Some(group) = changes.group {
            user.group = Some(group);
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError> {
        Ok(self.quizzes.read().await.iter().find(|q| q.id == id).cloned())
    }

    async fn list_quizzes(&self, scope: QuizScope<'_>) -> Result<Vec<Quiz>, AppError> {
        let quizzes = self.quizzes.read().await;
        let mut listed: Vec<Quiz> = quizzes
            .iter()
            .filter(|q| match scope {
                QuizScope::All => true,
                QuizScope::Class { grade, group } => q.grade == grade && q.group == group,
            })
            .cloned()
            .collect();
        listed.reverse();
        Ok(listed)
    }

    async fn insert_quiz(&self, def: QuizDefinition, created_at: DateTime<Utc>) -> Result<Quiz, AppError> {
        let quiz = Quiz::from_definition(Uuid::new_v4(), def, created_at);
        self.quizzes.write().await.push(quiz.clone());
        Ok(quiz)
    }

    async fn replace_quiz(&self, id: Uuid, def: QuizDefinition) -> Result<Option<Quiz>, AppError> {
        let mut quizzes = self.quizzes.write().await;
        let Some(quiz) = quizzes.iter_mut().find(|q| q.id == id) else {
            return Ok(None);
        };
        *quiz = Quiz::from_definition(id, def, quiz.created_at);
        Ok(Some(quiz.clone()))
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError> {
        let mut quizzes = self.quizzes.write().await;
        let before = quizzes.len();
        quizzes.retain(|q| q.id != id);
        Ok(quizzes.len() != before)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn find_attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, AppError> {
        Ok(self.attempts.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list_user_attempts(
        &self,
        user_id: Uuid,
        quiz_id: Option<Uuid>,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = self.attempts.read().await;
        let mut listed: Vec<QuizAttempt> = attempts
            .iter()
            .filter(|a| a.user_id == user_id && quiz_id.is_none_or(|q| a.quiz_id == q))
            .cloned()
            .collect();
        listed.reverse();
        Ok(listed)
    }

    async fn list_quiz_attempts(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>, AppError> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn list_all_attempts(&self) -> Result<Vec<QuizAttempt>, AppError> {
        Ok(self.attempts.read().await.clone())
    }

    async fn create_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        max_attempts: i32,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let mut attempts = self.attempts.write().await;
        let mut prior = 0;
        let mut last_number = 0;
        for existing in attempts
            .iter()
            .filter(|a| a.user_id == attempt.user_id && a.quiz_id == attempt.quiz_id)
        {
            prior += 1;
            last_number = last_number.max(existing.attempt_number);
        }
        if prior >= max_attempts {
            return Ok(None);
        }

        let created = QuizAttempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            // Numbers are never reused, even after a deletion.
            attempt_number: last_number + 1,
            answers: Answers::new(),
            total_questions: attempt.total_questions,
            started_at: attempt.started_at,
            expires_at: attempt.expires_at,
            status: AttemptStatus::InProgress,
        };
        attempts.push(created.clone());
        Ok(Some(created))
    }

    async fn complete_attempt(
        &self,
        id: Uuid,
        answers: Answers,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let mut attempts = self.attempts.write().await;
        let Some(attempt) = attempts
            .iter_mut()
            .find(|a| a.id == id && !a.is_completed())
        else {
            return Ok(None);
        };

        attempt.answers = answers;
        attempt.status = AttemptStatus::Completed { score, completed_at };
        Ok(Some(attempt.clone()))
    }

    async fn delete_attempt(&self, id: Uuid) -> Result<bool, AppError> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|a| a.id != id);
        Ok(attempts.len() != before)
    }
}
