use std::sync::Arc;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::QuizQuestionType;
use crate::models::domain::{Quiz, QuizAnswer, QuizAttempt, QuizQuestion};
use crate::services::clock::{Clock, SystemClock};

pub const DEFAULT_XP_PER_QUESTION: i64 = 5;

/// Why an otherwise well-formed attempt was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
pub enum RejectionReason {
    QuizClosed,
    SingleAttemptExceeded,
    MaxAttemptsExceeded,
    DuplicateSubmission,
}

impl RejectionReason {
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::QuizClosed => "This quiz is closed: its due date has passed.",
            RejectionReason::SingleAttemptExceeded => "This quiz can only be taken once.",
            RejectionReason::MaxAttemptsExceeded => "You have used all attempts for this quiz.",
            RejectionReason::DuplicateSubmission => "This attempt has already been submitted.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptResult {
    pub accepted: bool,
    pub reason: Option<RejectionReason>,
    pub score: u32,
    pub total_questions: u32,
    pub attempt_number: Option<u32>,
    pub xp_awarded: i64,
    pub attempts_left: Option<u32>,
    pub question_results: Vec<bool>,
}

impl AttemptResult {
    pub fn rejected(reason: RejectionReason, quiz: &Quiz, prior_attempts: u32) -> Self {
        AttemptResult {
            accepted: false,
            reason: Some(reason),
            score: 0,
            total_questions: quiz.question_count(),
            attempt_number: None,
            xp_awarded: 0,
            attempts_left: quiz
                .effective_max_attempts()
                .map(|max| max.saturating_sub(prior_attempts)),
            question_results: Vec::new(),
        }
    }
}

/// Validates attempts against a quiz's policy, grades them and works out XP.
pub struct QuizAttemptService {
    clock: Arc<dyn Clock>,
    default_xp_per_question: i64,
}

impl Default for QuizAttemptService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_XP_PER_QUESTION)
    }
}

impl QuizAttemptService {
    pub fn new(clock: Arc<dyn Clock>, default_xp_per_question: i64) -> Self {
        Self {
            clock,
            default_xp_per_question,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn default_xp_per_question(&self) -> i64 {
        self.default_xp_per_question
    }

    /// `answers[i]` answers `quiz.questions[i]`; `quiz` must be in the order
    /// the student saw it.
    pub fn score_attempt(
        &self,
        quiz: &Quiz,
        prior_attempts: u32,
        answers: &[QuizAnswer],
    ) -> AttemptResult {
        if let Err(reason) = Self::check_policy(quiz, prior_attempts, self.clock.now()) {
            return AttemptResult::rejected(reason, quiz, prior_attempts);
        }

        let attempt_number = prior_attempts + 1;
        let question_results: Vec<bool> = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| Self::grade_question(question, answers.get(index)))
            .collect();
        let score = question_results.iter().filter(|correct| **correct).count() as u32;

        AttemptResult {
            accepted: true,
            reason: None,
            score,
            total_questions: quiz.question_count(),
            attempt_number: Some(attempt_number),
            xp_awarded: self.award_xp(quiz, score, attempt_number),
            attempts_left: quiz
                .effective_max_attempts()
                .map(|max| max.saturating_sub(attempt_number)),
            question_results,
        }
    }

    pub fn check_policy(
        quiz: &Quiz,
        prior_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), RejectionReason> {
        if quiz.is_closed_at(now) {
            return Err(RejectionReason::QuizClosed);
        }
        if quiz.single_attempt && prior_attempts > 0 {
            return Err(RejectionReason::SingleAttemptExceeded);
        }
        if let Some(max_attempts) = quiz.max_attempts {
            if prior_attempts + 1 > max_attempts {
                return Err(RejectionReason::MaxAttemptsExceeded);
            }
        }
        Ok(())
    }

    pub fn grade_question(question: &QuizQuestion, answer: Option<&QuizAnswer>) -> bool {
        let Some(answer) = answer else {
            return false;
        };

        match question.kind() {
            QuizQuestionType::Mcq | QuizQuestionType::TrueFalse => {
                matches!(
                    (answer.option_index, question.correct_option),
                    (Some(chosen), Some(correct)) if chosen == correct
                )
            }
            QuizQuestionType::Short => match (&answer.text, &question.correct_answer_text) {
                (Some(given), Some(expected)) => {
                    given.trim().to_lowercase() == expected.trim().to_lowercase()
                }
                _ => false,
            },
            QuizQuestionType::Numeric => {
                let given = answer.text.as_deref().map(str::trim).unwrap_or_default();
                if given.is_empty() {
                    return false;
                }
                match (given.parse::<f64>(), question.correct_number) {
                    (Ok(value), Some(expected)) => value == expected,
                    _ => false,
                }
            }
        }
    }

    /// Only the very first attempt earns XP; retakes score normally but award nothing.
    pub fn award_xp(&self, quiz: &Quiz, score: u32, attempt_number: u32) -> i64 {
        if attempt_number != 1 {
            return 0;
        }
        let per_question = quiz.xp_per_question.unwrap_or(self.default_xp_per_question);
        i64::from(score) * per_question
    }

    /// Builds the record for an accepted attempt.
    pub fn create_attempt(
        quiz_id: &str,
        student_id: &str,
        result: &AttemptResult,
        answers: Vec<QuizAnswer>,
        auto_submitted: bool,
        completed_at: DateTime<Utc>,
    ) -> AppResult<QuizAttempt> {
        let attempt_number = match (result.accepted, result.attempt_number) {
            (true, Some(number)) => number,
            _ => {
                return Err(AppError::InternalError(
                    "Cannot record a rejected attempt".to_string(),
                ))
            }
        };

        Ok(QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            student_id: student_id.to_string(),
            score: result.score,
            total_questions: result.total_questions,
            attempt_number,
            xp_awarded: result.xp_awarded,
            answers,
            question_results: result.question_results.clone(),
            auto_submitted,
            completed_at,
        })
    }
}

/// Scores against the system clock with the default XP rate.
pub fn score_attempt(quiz: &Quiz, prior_attempts: u32, answers: &[QuizAnswer]) -> AttemptResult {
    QuizAttemptService::default().score_attempt(quiz, prior_attempts, answers)
}
