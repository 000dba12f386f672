// src/repository/mod.rs

//! Persistence seams. Business logic only talks to these traits, so the same
//! lifecycle runs against Postgres in production and [`MemoryStore`] in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Answers, NewAttempt, QuizAttempt},
        quiz::{Quiz, QuizDefinition},
        user::{NewUser, User, UserChanges},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which quizzes a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum QuizScope<'a> {
    All,
    Class { grade: &'a str, group: &'a str },
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError>;

    /// Newest first.
    async fn list_quizzes(&self, scope: QuizScope<'_>) -> Result<Vec<Quiz>, AppError>;

    async fn insert_quiz(&self, def: QuizDefinition, created_at: DateTime<Utc>) -> Result<Quiz, AppError>;

    /// Whole-record replacement. Attempts keep their question count snapshot.
    async fn replace_quiz(&self, id: Uuid, def: QuizDefinition) -> Result<Option<Quiz>, AppError>;

    /// Removes the quiz only; its attempts stay in place.
    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn find_attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, AppError>;

    /// Attempts of one user, newest first.
    async fn list_user_attempts(
        &self,
        user_id: Uuid,
        quiz_id: Option<Uuid>,
    ) -> Result<Vec<QuizAttempt>, AppError>;

    /// Attempts on one quiz in the order they were started.
    async fn list_quiz_attempts(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>, AppError>;

    async fn list_all_attempts(&self) -> Result<Vec<QuizAttempt>, AppError>;

    /// Counts the user's attempts on the quiz and, if fewer than `max_attempts`,
    /// inserts a new in-progress attempt numbered count + 1. Both steps are one
    /// atomic unit per (user, quiz). Returns `None` when the limit is reached.
    async fn create_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        max_attempts: i32,
    ) -> Result<Option<QuizAttempt>, AppError>;

    /// Completes the attempt only if it is still in progress. Returns `None`
    /// when it is gone or was completed first by someone else.
    async fn complete_attempt(
        &self,
        id: Uuid,
        answers: Answers,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<QuizAttempt>, AppError>;

    async fn delete_attempt(&self, id: Uuid) -> Result<bool, AppError>;
}
