use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed, scored pass over a quiz. Never modified after insert.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub student_id: String,
    pub score: u32,
    pub total_questions: u32,
    /// 1-based, scoped to (student_id, quiz_id).
    pub attempt_number: u32,
    pub xp_awarded: i64,
    pub answers: Vec<QuizAnswer>,
    pub question_results: Vec<bool>,
    #[serde(default)]
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
}

/// Answer to the question at the same position of the presented quiz.
/// Choice questions use `option_index`, short and numeric questions use `text`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, InputObject)]
#[graphql(name = "QuizAnswerInput")]
pub struct QuizAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl QuizAnswer {
    pub fn choice(option_index: u32) -> Self {
        QuizAnswer {
            option_index: Some(option_index),
            text: None,
        }
    }

    pub fn text(text: &str) -> Self {
        QuizAnswer {
            option_index: None,
            text: Some(text.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.option_index.is_none()
            && self
                .text
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_attempt(score: u32, attempt_number: u32, xp_awarded: i64) -> QuizAttempt {
        QuizAttempt {
            id: "attempt-1".to_string(),
            quiz_id: "quiz-1".to_string(),
            student_id: "student@example.com".to_string(),
            score,
            total_questions: 3,
            attempt_number,
            xp_awarded,
            answers: vec![QuizAnswer::choice(1), QuizAnswer::text("42")],
            question_results: vec![true, false, false],
            auto_submitted: false,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn quiz_attempt_round_trip_serialization_preserves_grading_fields() {
        let attempt = make_attempt(1, 1, 5);

        let json = serde_json::to_string(&attempt).expect("attempt should serialize");
        let parsed: QuizAttempt = serde_json::from_str(&json).expect("attempt should deserialize");

        assert_eq!(parsed.score, 1);
        assert_eq!(parsed.attempt_number, 1);
        assert_eq!(parsed.xp_awarded, 5);
        assert_eq!(parsed.answers[1].text.as_deref(), Some("42"));
        assert_eq!(parsed.question_results, vec![true, false, false]);
    }

    #[test]
    fn blank_answers_are_detected() {
        assert!(QuizAnswer::default().is_blank());
        assert!(QuizAnswer::text("   ").is_blank());
        assert!(!QuizAnswer::text("3").is_blank());
        assert!(!QuizAnswer::choice(0).is_blank());
    }
}
