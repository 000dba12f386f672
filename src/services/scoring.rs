// src/services/scoring.rs

use crate::models::{
    attempt::Answers,
    quiz::{Question, answer_key},
};

/// Counts correct answers.
///
/// The answer to the question at position `i` is looked up under `q{i}` and
/// compared to the correct answer by exact string equality. Missing answers
/// count as wrong; keys that address no question are ignored.
pub fn score(questions: &[Question], answers: &Answers) -> i32 {
    questions
        .iter()
        .enumerate()
        .filter(|(i, question)| {
            answers
                .get(&answer_key(*i))
                .is_some_and(|given| *given == question.correct_answer)
        })
        .count() as i32
}

/// Score as a percentage of `total_questions`, rounded to two decimals.
pub fn percentage(score: i32, total_questions: i32) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    round2(score as f64 / total_questions as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
