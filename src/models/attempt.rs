// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::scoring::percentage;

/// Submitted answers, keyed by question position ("q0", "q1", ...).
pub type Answers = BTreeMap<String, String>;

/// Where an attempt stands. Score and completion time only exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed {
        score: i32,
        completed_at: DateTime<Utc>,
    },
}

/// One student's engagement with one quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,

    /// 1-based, per (user, quiz).
    pub attempt_number: i32,

    pub answers: Answers,

    /// Question count when the attempt started.
    pub total_questions: i32,

    pub started_at: DateTime<Utc>,

    /// When the client countdown reaches zero and auto-submits.
    pub expires_at: DateTime<Utc>,

    #[serde(flatten)]
    pub status: AttemptStatus,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, AttemptStatus::Completed { .. })
    }

    pub fn score(&self) -> Option<i32> {
        match self.status {
            AttemptStatus::Completed { score, .. } => Some(score),
            AttemptStatus::InProgress => None,
        }
    }

    /// Score as a percentage of the question count snapshot.
    pub fn percentage(&self) -> Option<f64> {
        self.score().map(|s| percentage(s, self.total_questions))
    }
}

/// Record handed to an attempt repository. The repository assigns the id and attempt number.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub total_questions: i32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Attempt as returned over HTTP.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub percentage: Option<f64>,
}

impl From<QuizAttempt> for AttemptView {
    fn from(attempt: QuizAttempt) -> Self {
        let percentage = attempt.percentage();
        Self { attempt, percentage }
    }
}

/// DTO for starting an attempt. Attempt numbers are assigned by the server.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: Uuid,
}

/// DTO for submitting an attempt. The final answer map replaces any stored answers.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub answers: Answers,
}

/// Query parameters for listing the caller's attempts.
#[derive(Debug, Deserialize)]
pub struct AttemptListParams {
    pub quiz_id: Option<Uuid>,
}
