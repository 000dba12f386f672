// src/models/stats.rs

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

/// Leaderboard row of a quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopScore {
    pub user_id: Uuid,
    pub user_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub attempt_number: i32,
}

/// Summary of all attempts on one quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub total_attempts: usize,
    pub average_score: f64,
    /// Completed attempts as a percentage of all attempts.
    pub completion_rate: f64,
    pub top_scores: Vec<TopScore>,
}

/// Portal-wide figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_students: usize,
    pub total_quizzes: usize,
    pub active_quizzes: usize,
    pub total_attempts: usize,
    pub completed_attempts: usize,
    pub average_score: f64,
    pub grade_distribution: BTreeMap<String, usize>,
    pub group_distribution: BTreeMap<String, usize>,
}
