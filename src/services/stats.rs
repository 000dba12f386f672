// src/services/stats.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::{TOP_SCORES_LIMIT, UNKNOWN_USER_NAME},
    error::AppError,
    models::{
        attempt::QuizAttempt,
        quiz::Quiz,
        stats::{AdminOverview, QuizStats, TopScore},
        user::{Role, User},
    },
    services::scoring::round2,
    state::AppState,
};

/// Folds the attempts of one quiz, given in start order, into its statistics.
pub fn summarize_quiz(attempts: &[QuizAttempt], names: &HashMap<Uuid, String>) -> QuizStats {
    let total_attempts = attempts.len();

    let mut completed: Vec<(&QuizAttempt, i32)> = attempts
        .iter()
        .filter_map(|a| a.score().map(|score| (a, score)))
        .collect();

    let average_score = if completed.is_empty() {
        0.0
    } else {
        let sum: i64 = completed.iter().map(|(_, score)| i64::from(*score)).sum();
        round2(sum as f64 / completed.len() as f64)
    };

    let completion_rate = if total_attempts == 0 {
        0.0
    } else {
        round2(completed.len() as f64 / total_attempts as f64 * 100.0)
    };

    // Stable: equal scores keep their start order.
    completed.sort_by(|a, b| b.1.cmp(&a.1));
    let top_scores = completed
        .into_iter()
        .take(TOP_SCORES_LIMIT)
        .map(|(attempt, score)| TopScore {
            user_id: attempt.user_id,
            user_name: names
                .get(&attempt.user_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
            score,
            total_questions: attempt.total_questions,
            attempt_number: attempt.attempt_number,
        })
        .collect();

    QuizStats {
        total_attempts,
        average_score,
        completion_rate,
        top_scores,
    }
}

/// Statistics of one quiz. Attempts of a deleted quiz are still summarized.
pub async fn quiz_stats(state: &AppState, quiz_id: Uuid) -> Result<QuizStats, AppError> {
    let attempts = state.attempts.list_quiz_attempts(quiz_id).await?;
    if attempts.is_empty() && state.quizzes.find_quiz(quiz_id).await?.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let mut names = HashMap::new();
    for attempt in attempts.iter().filter(|a| a.is_completed()) {
        if names.contains_key(&attempt.user_id) {
            continue;
        }
        if let Some(user) = state.users.find_user(attempt.user_id).await? {
            names.insert(user.id, user.name);
        }
    }

    Ok(summarize_quiz(&attempts, &names))
}

/// Portal-wide dashboard figures.
pub fn summarize_portal(
    users: &[User],
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
    now: DateTime<Utc>,
) -> AdminOverview {
    let students: Vec<&User> = users.iter().filter(|u| u.role == Role::Student).collect();

    let mut grade_distribution = BTreeMap::new();
    let mut group_distribution = BTreeMap::new();
    for student in &students {
        if let Some(grade) = &student.grade {
            *grade_distribution.entry(grade.clone()).or_insert(0) += 1;
        }
        if let Some(group) = &student.group {
            *group_distribution.entry(group.clone()).or_insert(0) += 1;
        }
    }

    let scores: Vec<i32> = attempts.iter().filter_map(QuizAttempt::score).collect();
    let average_score = if scores.is_empty() {
        0.0
    } else {
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        round2(sum as f64 / scores.len() as f64)
    };

    AdminOverview {
        total_students: students.len(),
        total_quizzes: quizzes.len(),
        active_quizzes: quizzes.iter().filter(|q| q.is_open(now)).count(),
        total_attempts: attempts.len(),
        completed_attempts: scores.len(),
        average_score,
        grade_distribution,
        group_distribution,
    }
}

pub async fn admin_overview(state: &AppState) -> Result<AdminOverview, AppError> {
    let users = state.users.list_users().await?;
    let quizzes = state
        .quizzes
        .list_quizzes(crate::repository::QuizScope::All)
        .await?;
    let attempts = state.attempts.list_all_attempts().await?;

    Ok(summarize_portal(&users, &quizzes, &attempts, state.clock.now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::attempt::{Answers, AttemptStatus},
        services::lifecycle::{start_attempt, submit_attempt},
        testing::{create_quiz, definition, register_student, test_state},
    };

    fn attempt(user_id: Uuid, number: i32, score: Option<i32>) -> QuizAttempt {
        let now = Utc::now();
        QuizAttempt {
            id: Uuid::new_v4(),
            user_id,
            quiz_id: Uuid::nil(),
            attempt_number: number,
            answers: Answers::new(),
            total_questions: 10,
            started_at: now,
            expires_at: now,
            status: match score {
                Some(score) => AttemptStatus::Completed { score, completed_at: now },
                None => AttemptStatus::InProgress,
            },
        }
    }

    #[test]
    fn test_summary_example() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let names = HashMap::from([
            (a, "Ana".to_string()),
            (b, "Ben".to_string()),
            (c, "Cy".to_string()),
        ]);
        let attempts = vec![attempt(a, 1, Some(8)), attempt(b, 1, Some(10)), attempt(c, 1, None)];

        let stats = summarize_quiz(&attempts, &names);

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.average_score, 9.0);
        assert_eq!(stats.completion_rate, 66.67);
        let scores: Vec<i32> = stats.top_scores.iter().map(|t| t.score).collect();
        assert_eq!(scores, vec![10, 8]);
        assert_eq!(stats.top_scores[0].user_name, "Ben");
    }

    #[test]
    fn test_empty_summary() {
        let stats = summarize_quiz(&[], &HashMap::new());
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(stats.top_scores.is_empty());
    }

    #[test]
    fn test_nothing_completed_yet() {
        let stats = summarize_quiz(&[attempt(Uuid::new_v4(), 1, None)], &HashMap::new());
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn test_ties_keep_start_order_and_top_ten() {
        let user = Uuid::new_v4();
        let attempts: Vec<QuizAttempt> = (1..=12).map(|n| attempt(user, n, Some(5))).collect();

        let stats = summarize_quiz(&attempts, &HashMap::new());

        assert_eq!(stats.top_scores.len(), TOP_SCORES_LIMIT);
        let numbers: Vec<i32> = stats.top_scores.iter().map(|t| t.attempt_number).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_user_gets_placeholder() {
        let stats = summarize_quiz(&[attempt(Uuid::new_v4(), 1, Some(3))], &HashMap::new());
        assert_eq!(stats.top_scores[0].user_name, UNKNOWN_USER_NAME);
    }

    #[tokio::test]
    async fn test_quiz_stats_after_user_deleted() {
        let state = test_state();
        let ana = register_student(&state, "ana@example.com", "grade-1", "group-a").await;
        let quiz = create_quiz(&state, definition("grade-1", "group-a", 1)).await;
        let attempt = start_attempt(&state, &ana, quiz.id).await.unwrap();
        let answers: Answers = [("q0".to_string(), "b".to_string())].into();
        submit_attempt(&state, attempt.id, answers, &ana).await.unwrap();
        state.users.delete_user(ana.id).await.unwrap();

        let stats = quiz_stats(&state, quiz.id).await.unwrap();
        assert_eq!(stats.top_scores.len(), 1);
        assert_eq!(stats.top_scores[0].user_name, UNKNOWN_USER_NAME);
        assert_eq!(stats.top_scores[0].score, 1);
    }

    #[tokio::test]
    async fn test_quiz_stats_for_unknown_quiz() {
        let state = test_state();
        let result = quiz_stats(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_overview() {
        let state = test_state();
        let ana = register_student(&state, "ana@example.com", "grade-1", "group-a").await;
        register_student(&state, "ben@example.com", "grade-1", "group-b").await;
        crate::testing::create_admin(&state).await;
        let open = create_quiz(&state, definition("grade-1", "group-a", 1)).await;
        let mut closed = definition("grade-1", "group-a", 1);
        closed.is_active = false;
        create_quiz(&state, closed).await;

        let attempt = start_attempt(&state, &ana, open.id).await.unwrap();
        let answers: Answers = [("q0".to_string(), "b".to_string()), ("q1".to_string(), "true".to_string())].into();
        submit_attempt(&state, attempt.id, answers, &ana).await.unwrap();

        let overview = admin_overview(&state).await.unwrap();
        assert_eq!(overview.total_students, 2);
        assert_eq!(overview.total_quizzes, 2);
        assert_eq!(overview.active_quizzes, 1);
        assert_eq!(overview.total_attempts, 1);
        assert_eq!(overview.completed_attempts, 1);
        assert_eq!(overview.average_score, 2.0);
        assert_eq!(overview.grade_distribution.get("grade-1"), Some(&2));
        assert_eq!(overview.group_distribution.get("group-b"), Some(&1));
    }
}
