use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::quiz_question::QuizQuestion;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub class_id: String,
    pub created_by_user_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub randomize_questions: bool,
    #[serde(default)]
    pub randomize_options: bool,
    #[serde(default)]
    pub single_attempt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_per_question: Option<i64>,
    #[serde(default)]
    pub show_explanations: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(
        class_id: &str,
        created_by_user_id: &str,
        title: &str,
        questions: Vec<QuizQuestion>,
    ) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            created_by_user_id: created_by_user_id.to_string(),
            title: title.to_string(),
            questions,
            randomize_questions: false,
            randomize_options: false,
            single_attempt: false,
            max_attempts: None,
            due_date: None,
            xp_value: None,
            xp_per_question: None,
            show_explanations: false,
            time_limit_secs: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// `single_attempt` pins the limit to exactly one, whatever `max_attempts` says.
    pub fn effective_max_attempts(&self) -> Option<u32> {
        if self.single_attempt {
            Some(1)
        } else {
            self.max_attempts
        }
    }

    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|due| due < now).unwrap_or(false)
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit_secs.map(|secs| secs > 0).unwrap_or(false)
    }

    pub fn question_count(&self) -> u32 {
        self.questions.len() as u32
    }

    /// XP a student is told they can earn on a first attempt.
    pub fn advertised_xp(&self, default_xp_per_question: i64) -> i64 {
        match (self.xp_per_question, self.xp_value) {
            (Some(per_question), _) => per_question * i64::from(self.question_count()),
            (None, Some(value)) => value,
            (None, None) => default_xp_per_question * i64::from(self.question_count()),
        }
    }
}
