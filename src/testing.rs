// src/testing.rs

//! Fixtures shared by unit tests.

use chrono::{Duration, Utc};

use crate::{
    config::Config,
    models::{
        quiz::{Question, QuestionKind, Quiz, QuizDefinition},
        user::{NewUser, RegisterRequest, Role, User},
    },
    services::identity,
    state::AppState,
    utils::hash::hash_password,
};

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "unit_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_name: None,
        admin_email: None,
        admin_password: None,
    }
}

pub fn test_state() -> AppState {
    AppState::in_memory(test_config())
}

pub async fn register_student(state: &AppState, email: &str, grade: &str, group: &str) -> User {
    identity::register(
        state,
        RegisterRequest {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            grade: grade.to_string(),
            group: group.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn create_admin(state: &AppState) -> User {
    state
        .users
        .insert_user(NewUser {
            name: "Teacher".to_string(),
            email: format!("admin-{}@example.com", uuid::Uuid::new_v4()),
            password: hash_password("adminpass").unwrap(),
            role: Role::Admin,
            grade: None,
            group: None,
        })
        .await
        .unwrap()
}

/// Multiple-choice (correct "b") followed by true/false (correct "true").
pub fn two_questions() -> Vec<Question> {
    vec![
        Question {
            prompt: "Which letter comes second?".to_string(),
            kind: QuestionKind::MultipleChoice,
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: "b".to_string(),
        },
        Question {
            prompt: "The earth orbits the sun".to_string(),
            kind: QuestionKind::TrueFalse,
            options: vec![],
            correct_answer: "true".to_string(),
        },
    ]
}

pub fn definition(grade: &str, group: &str, max_attempts: i32) -> QuizDefinition {
    QuizDefinition {
        title: format!("Quiz for {} {}", grade, group),
        description: None,
        grade: grade.to_string(),
        group: group.to_string(),
        subject: "science".to_string(),
        duration_minutes: 15,
        max_attempts,
        deadline: Utc::now() + Duration::days(7),
        is_active: true,
        questions: two_questions(),
    }
}

pub async fn create_quiz(state: &AppState, def: QuizDefinition) -> Quiz {
    state.quizzes.insert_quiz(def, Utc::now()).await.unwrap()
}
