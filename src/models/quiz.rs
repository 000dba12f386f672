// src/models/quiz.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::user::User;

/// Canonical true/false answer tokens, used both when authoring and when answering.
pub const TRUE_TOKEN: &str = "true";
pub const FALSE_TOKEN: &str = "false";

/// One option letter per alphabet position.
pub const MAX_OPTIONS: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

/// A question embedded in a quiz. Its position in the quiz is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,

    /// Option texts, addressed by letter ('a' for the first one).
    /// Empty for true/false questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Option letter for multiple-choice, "true"/"false" for true/false.
    pub correct_answer: String,
}

impl Question {
    /// Whether `value` belongs to the answer domain of this question.
    pub fn accepts(&self, value: &str) -> bool {
        match self.kind {
            QuestionKind::MultipleChoice => {
                (0..self.options.len()).any(|i| option_letter(i).as_deref() == Some(value))
            }
            QuestionKind::TrueFalse => value == TRUE_TOKEN || value == FALSE_TOKEN,
        }
    }
}

/// Letter addressing the option at `index` ("a", "b", ...).
pub fn option_letter(index: usize) -> Option<String> {
    if index >= MAX_OPTIONS {
        return None;
    }
    Some(char::from(b'a' + index as u8).to_string())
}

/// Key under which the answer to the question at `index` is submitted.
pub fn answer_key(index: usize) -> String {
    format!("q{}", index)
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub grade: String,
    pub group: String,
    pub subject: String,
    pub duration_minutes: i32,
    pub max_attempts: i32,
    pub deadline: DateTime<Utc>,
    pub is_active: bool,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn from_definition(id: Uuid, def: QuizDefinition, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: def.title,
            description: def.description,
            grade: def.grade,
            group: def.group,
            subject: def.subject,
            duration_minutes: def.duration_minutes,
            max_attempts: def.max_attempts,
            deadline: def.deadline,
            is_active: def.is_active,
            questions: def.questions,
            created_at,
        }
    }

    /// Active and still before its deadline.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.deadline
    }

    /// Admins see every quiz; students only those of their own grade and group.
    pub fn is_visible_to(&self, user: &User) -> bool {
        user.is_admin()
            || (user.grade.as_deref() == Some(self.grade.as_str())
                && user.group.as_deref() == Some(self.group.as_str()))
    }

    pub fn question_count(&self) -> i32 {
        self.questions.len() as i32
    }

    pub fn to_public(&self, now: DateTime<Utc>) -> PublicQuiz {
        PublicQuiz {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            grade: self.grade.clone(),
            group: self.group.clone(),
            subject: self.subject.clone(),
            duration_minutes: self.duration_minutes,
            max_attempts: self.max_attempts,
            deadline: self.deadline,
            is_available: self.is_open(now),
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    prompt: q.prompt.clone(),
                    kind: q.kind,
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

/// DTO for sending a question to students (excludes the correct answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Student-facing quiz view.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub grade: String,
    pub group: String,
    pub subject: String,
    pub duration_minutes: i32,
    pub max_attempts: i32,
    pub deadline: DateTime<Utc>,
    pub is_available: bool,
    pub questions: Vec<PublicQuestion>,
}

fn default_max_attempts() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

/// DTO for creating or replacing a quiz.
///
/// Past deadlines are accepted: such a quiz is simply never available.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizDefinition {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub grade: String,
    #[validate(length(min = 1, max = 50))]
    pub group: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(range(min = 1, message = "Duration must be at least one minute."))]
    pub duration_minutes: i32,
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, message = "At least one attempt must be allowed."))]
    pub max_attempts: i32,
    pub deadline: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[validate(
        length(min = 1, message = "A quiz needs at least one question."),
        custom(function = validate_questions)
    )]
    pub questions: Vec<Question>,
}

fn invalid_question(index: usize, reason: &str) -> ValidationError {
    ValidationError::new("invalid_question")
        .with_message(Cow::Owned(format!("question {}: {}", index, reason)))
}

/// Checks every question against the authoring rules of its type.
fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    for (i, question) in questions.iter().enumerate() {
        if question.prompt.trim().is_empty() {
            return Err(invalid_question(i, "prompt must not be empty"));
        }
        if question.prompt.len() > 2000 {
            return Err(invalid_question(i, "prompt is too long"));
        }

        match question.kind {
            QuestionKind::MultipleChoice => {
                if question.options.len() < 2 {
                    return Err(invalid_question(i, "needs at least two options"));
                }
                if question.options.len() > MAX_OPTIONS {
                    return Err(invalid_question(i, "has too many options"));
                }
                if question.options.iter().any(|o| o.trim().is_empty()) {
                    return Err(invalid_question(i, "options must not be empty"));
                }
                if !question.accepts(&question.correct_answer) {
                    return Err(invalid_question(
                        i,
                        "correct answer must be the letter of one of its options",
                    ));
                }
            }
            QuestionKind::TrueFalse => {
                if !question.options.is_empty() {
                    return Err(invalid_question(i, "true/false questions take no options"));
                }
                if !question.accepts(&question.correct_answer) {
                    return Err(invalid_question(
                        i,
                        "correct answer must be \"true\" or \"false\"",
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn multiple_choice(correct: &str) -> Question {
        Question {
            prompt: "Pick one".to_string(),
            kind: QuestionKind::MultipleChoice,
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct.to_string(),
        }
    }

    fn true_false(correct: &str) -> Question {
        Question {
            prompt: "Is it so?".to_string(),
            kind: QuestionKind::TrueFalse,
            options: vec![],
            correct_answer: correct.to_string(),
        }
    }

    fn definition(questions: Vec<Question>) -> QuizDefinition {
        QuizDefinition {
            title: "Fractions".to_string(),
            description: None,
            grade: "grade-1".to_string(),
            group: "group-a".to_string(),
            subject: "math".to_string(),
            duration_minutes: 10,
            max_attempts: 1,
            deadline: Utc::now() + Duration::days(1),
            is_active: true,
            questions,
        }
    }

    #[test]
    fn test_valid_definition() {
        let def = definition(vec![multiple_choice("b"), true_false("true")]);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_past_deadline_is_allowed() {
        let mut def = definition(vec![true_false("false")]);
        def.deadline = Utc::now() - Duration::days(3);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_questions() {
        let def = definition(vec![]);
        let errors = def.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("questions"));
    }

    #[test]
    fn test_rejects_zero_duration_and_attempts() {
        let mut def = definition(vec![true_false("true")]);
        def.duration_minutes = 0;
        def.max_attempts = 0;
        let errors = def.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("duration_minutes"));
        assert!(fields.contains_key("max_attempts"));
    }

    #[test]
    fn test_rejects_correct_answer_outside_options() {
        let def = definition(vec![multiple_choice("e")]);
        let errors = def.validate().unwrap_err();
        assert!(errors.to_string().contains("question 0"));
    }

    #[test]
    fn test_rejects_single_option() {
        let mut question = multiple_choice("a");
        question.options.truncate(1);
        assert!(definition(vec![question]).validate().is_err());
    }

    #[test]
    fn test_rejects_localized_true_false_token() {
        let def = definition(vec![true_false("True")]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_prompt() {
        let mut question = true_false("true");
        question.prompt = "   ".to_string();
        let errors = definition(vec![true_false("true"), question]).validate().unwrap_err();
        assert!(errors.to_string().contains("question 1"));
    }

    #[test]
    fn test_question_json_shape() {
        let raw = r#"{"prompt":"2+2=4","type":"true-false","correct_answer":"true"}"#;
        let question: Question = serde_json::from_str(raw).unwrap();
        assert_eq!(question.kind, QuestionKind::TrueFalse);
        assert!(question.options.is_empty());
    }

    #[test]
    fn test_option_letters() {
        assert_eq!(option_letter(0).as_deref(), Some("a"));
        assert_eq!(option_letter(3).as_deref(), Some("d"));
        assert_eq!(option_letter(MAX_OPTIONS), None);
        assert_eq!(answer_key(2), "q2");
    }
}
