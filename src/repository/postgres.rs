// src/repository/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Answers, AttemptStatus, NewAttempt, QuizAttempt},
        quiz::{Question, Quiz, QuizDefinition},
        user::{NewUser, Role, User, UserChanges},
    },
};

use super::{AttemptRepository, QuizRepository, QuizScope, UserRepository};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Row of the 'users' table.
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    role: String,
    grade: Option<String>,
    group_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(AppError::InternalServerError)?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role,
            grade: row.grade,
            group: row.group_name,
            created_at: row.created_at,
        })
    }
}

/// Row of the 'quizzes' table. Questions are stored as a JSONB array.
#[derive(FromRow)]
struct QuizRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    grade: String,
    group_name: String,
    subject: String,
    duration_minutes: i32,
    max_attempts: i32,
    deadline: DateTime<Utc>,
    is_active: bool,
    questions: Json<Vec<Question>>,
    created_at: DateTime<Utc>,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            grade: row.grade,
            group: row.group_name,
            subject: row.subject,
            duration_minutes: row.duration_minutes,
            max_attempts: row.max_attempts,
            deadline: row.deadline,
            is_active: row.is_active,
            questions: row.questions.0,
            created_at: row.created_at,
        }
    }
}

/// Row of the 'quiz_attempts' table.
/// `score` and `completed_at` are NULL together while the attempt is in progress.
#[derive(FromRow)]
struct AttemptRow {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    attempt_number: i32,
    answers: Json<Answers>,
    score: Option<i32>,
    total_questions: i32,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let status = match (row.score, row.completed_at) {
            (None, None) => AttemptStatus::InProgress,
            (Some(score), Some(completed_at)) => AttemptStatus::Completed { score, completed_at },
            _ => {
                return Err(AppError::InternalServerError(format!(
                    "attempt {} has a partial completion record",
                    row.id
                )));
            }
        };
        Ok(QuizAttempt {
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            attempt_number: row.attempt_number,
            answers: row.answers.0,
            total_questions: row.total_questions,
            started_at: row.started_at,
            expires_at: row.expires_at,
            status,
        })
    }
}

fn into_attempts(rows: Vec<AttemptRow>) -> Result<Vec<QuizAttempt>, AppError> {
    rows.into_iter().map(QuizAttempt::try_from).collect()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password, role, grade, group_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(&user.grade)
        .bind(&user.group)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email '{}' is already registered", user.email))
            } else {
                tracing::error!("Failed to insert user: {:?}", e);
                AppError::from(e)
            }
        })?;

        User::try_from(row)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                grade = COALESCE($4, grade),
                group_name = COALESCE($5, group_name)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.grade)
        .bind(changes.group)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::from))
    }

    async fn list_quizzes(&self, scope: QuizScope<'_>) -> Result<Vec<Quiz>, AppError> {
        let rows = match scope {
            QuizScope::All => {
                sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            QuizScope::Class { grade, group } => {
                sqlx::query_as::<_, QuizRow>(
                    r#"
                    SELECT * FROM quizzes
                    WHERE grade = $1 AND group_name = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(grade)
                .bind(group)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn insert_quiz(&self, def: QuizDefinition, created_at: DateTime<Utc>) -> Result<Quiz, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes (
                id, title, description, grade, group_name, subject,
                duration_minutes, max_attempts, deadline, is_active, questions, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&def.title)
        .bind(&def.description)
        .bind(&def.grade)
        .bind(&def.group)
        .bind(&def.subject)
        .bind(def.duration_minutes)
        .bind(def.max_attempts)
        .bind(def.deadline)
        .bind(def.is_active)
        .bind(Json(&def.questions))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quiz: {:?}", e);
            AppError::from(e)
        })?;

        Ok(Quiz::from(row))
    }

    async fn replace_quiz(&self, id: Uuid, def: QuizDefinition) -> Result<Option<Quiz>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            UPDATE quizzes SET
                title = $2, description = $3, grade = $4, group_name = $5, subject = $6,
                duration_minutes = $7, max_attempts = $8, deadline = $9, is_active = $10,
                questions = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&def.title)
        .bind(&def.description)
        .bind(&def.grade)
        .bind(&def.group)
        .bind(&def.subject)
        .bind(def.duration_minutes)
        .bind(def.max_attempts)
        .bind(def.deadline)
        .bind(def.is_active)
        .bind(Json(&def.questions))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Quiz::from))
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn find_attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, AppError> {
        sqlx::query_as::<_, AttemptRow>("SELECT * FROM quiz_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(QuizAttempt::try_from)
            .transpose()
    }

    async fn list_user_attempts(
        &self,
        user_id: Uuid,
        quiz_id: Option<Uuid>,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1 AND ($2::UUID IS NULL OR quiz_id = $2)
            ORDER BY started_at DESC, attempt_number DESC
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        into_attempts(rows)
    }

    async fn list_quiz_attempts(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM quiz_attempts WHERE quiz_id = $1 ORDER BY started_at, attempt_number",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        into_attempts(rows)
    }

    async fn list_all_attempts(&self) -> Result<Vec<QuizAttempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM quiz_attempts ORDER BY started_at, attempt_number",
        )
        .fetch_all(&self.pool)
        .await?;

        into_attempts(rows)
    }

    async fn create_attempt_within_limit(
        &self,
        attempt: NewAttempt,
        max_attempts: i32,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent starts of the same (user, quiz) until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", attempt.user_id, attempt.quiz_id))
            .execute(&mut *tx)
            .await?;

        // Limit counts live attempts; numbering continues past deleted ones.
        let (prior, last_number): (i64, i32) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(MAX(attempt_number), 0)
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_id = $2
            "#,
        )
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .fetch_one(&mut *tx)
        .await?;

        if prior >= i64::from(max_attempts) {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO quiz_attempts (
                id, user_id, quiz_id, attempt_number, answers,
                total_questions, started_at, expires_at
            )
            VALUES ($1, $2, $3, $4, '{}'::jsonb, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(last_number + 1)
        .bind(attempt.total_questions)
        .bind(attempt.started_at)
        .bind(attempt.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Attempt was started concurrently".to_string())
            } else {
                tracing::error!("Failed to insert attempt: {:?}", e);
                AppError::from(e)
            }
        })?;

        tx.commit().await?;
        QuizAttempt::try_from(row).map(Some)
    }

    async fn complete_attempt(
        &self,
        id: Uuid,
        answers: Answers,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<QuizAttempt>, AppError> {
        sqlx::query_as::<_, AttemptRow>(
            r#"
            UPDATE quiz_attempts
            SET answers = $2, score = $3, completed_at = $4
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(&answers))
        .bind(score)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?
        .map(QuizAttempt::try_from)
        .transpose()
    }

    async fn delete_attempt(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quiz_attempts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
