use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::domain::{QuizAttempt, QuizQuestion, QuizQuestionType, Submission, User},
    services::{
        attempt_session::SessionState,
        quiz_attempt_service::RejectionReason,
        quiz_service::{GradedAttempt, PresentedQuiz, TimerStatus},
        similarity_service::{SimilarityMatch, TextComparison},
    },
};

/// A question as a student sees it: no answer key, no explanation.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PresentedQuestion {
    pub index: u32,
    pub prompt: String,
    pub question_type: QuizQuestionType,
    pub options: Vec<String>,
}

impl PresentedQuestion {
    fn from_question(index: usize, question: &QuizQuestion) -> Self {
        PresentedQuestion {
            index: index as u32,
            prompt: question.prompt.clone(),
            question_type: question.kind(),
            options: question.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizForTaking {
    pub id: String,
    pub class_id: String,
    pub title: String,
    pub questions: Vec<PresentedQuestion>,
    pub question_count: u32,
    pub due_date: Option<DateTime<Utc>>,
    pub closed: bool,
    pub time_limit_secs: Option<u32>,
    pub max_attempts: Option<u32>,
    pub attempts_used: u32,
    pub attempts_left: Option<u32>,
    pub xp_value: i64,
}

impl From<PresentedQuiz> for QuizForTaking {
    fn from(presented: PresentedQuiz) -> Self {
        let quiz = presented.quiz;
        QuizForTaking {
            questions: quiz
                .questions
                .iter()
                .enumerate()
                .map(|(index, question)| PresentedQuestion::from_question(index, question))
                .collect(),
            question_count: quiz.question_count(),
            max_attempts: quiz.effective_max_attempts(),
            time_limit_secs: quiz.time_limit_secs.filter(|_| quiz.is_timed()),
            due_date: quiz.due_date,
            id: quiz.id,
            class_id: quiz.class_id,
            title: quiz.title,
            closed: presented.closed,
            attempts_used: presented.attempts_used,
            attempts_left: presented.attempts_left,
            xp_value: presented.advertised_xp,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionFeedback {
    pub index: u32,
    pub correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptResultDto {
    pub accepted: bool,
    pub reason: Option<RejectionReason>,
    pub message: Option<String>,
    pub score: u32,
    pub total_questions: u32,
    pub attempt_number: Option<u32>,
    pub xp_awarded: i64,
    pub attempts_left: Option<u32>,
    pub auto_submitted: bool,
    pub feedback: Vec<QuestionFeedback>,
}

impl From<GradedAttempt> for AttemptResultDto {
    fn from(graded: GradedAttempt) -> Self {
        let result = graded.result;
        let feedback = result
            .question_results
            .iter()
            .enumerate()
            .map(|(index, correct)| QuestionFeedback {
                index: index as u32,
                correct: *correct,
                explanation: graded.explanations.get(index).cloned().flatten(),
            })
            .collect();

        AttemptResultDto {
            accepted: result.accepted,
            message: result.reason.map(|reason| reason.message().to_string()),
            reason: result.reason,
            score: result.score,
            total_questions: result.total_questions,
            attempt_number: result.attempt_number,
            xp_awarded: result.xp_awarded,
            attempts_left: result.attempts_left,
            auto_submitted: graded.auto_submitted,
            feedback,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizAttemptDto {
    pub id: String,
    pub quiz_id: String,
    pub attempt_number: u32,
    pub score: u32,
    pub total_questions: u32,
    pub xp_awarded: i64,
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
}

impl From<QuizAttempt> for QuizAttemptDto {
    fn from(attempt: QuizAttempt) -> Self {
        QuizAttemptDto {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            attempt_number: attempt.attempt_number,
            score: attempt.score,
            total_questions: attempt.total_questions,
            xp_awarded: attempt.xp_awarded,
            auto_submitted: attempt.auto_submitted,
            completed_at: attempt.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TimerStatusDto {
    pub quiz_id: String,
    pub state: SessionState,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining_secs: Option<i64>,
    /// Shown to the student when the deadline passed and their answers still
    /// need submitting.
    pub auto_submit_error: Option<String>,
}

impl From<TimerStatus> for TimerStatusDto {
    fn from(status: TimerStatus) -> Self {
        TimerStatusDto {
            quiz_id: status.quiz_id,
            state: status.state,
            deadline: status.deadline,
            remaining_secs: status.remaining.map(|remaining| remaining.num_seconds()),
            auto_submit_error: status.auto_submit_error,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SimilarityMatchDto {
    pub submission_id: String,
    pub score: f64,
}

impl From<SimilarityMatch> for SimilarityMatchDto {
    fn from(found: SimilarityMatch) -> Self {
        SimilarityMatchDto {
            submission_id: found.id,
            score: found.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TextComparisonDto {
    pub score: f64,
    pub overlap: Vec<String>,
}

impl From<TextComparison> for TextComparisonDto {
    fn from(comparison: TextComparison) -> Self {
        TextComparisonDto {
            score: comparison.score,
            overlap: comparison.overlap,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SubmissionDto {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub attempt_number: Option<u32>,
    pub submitted_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionDto {
    fn from(submission: Submission) -> Self {
        SubmissionDto {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            attempt_number: submission.attempt_number,
            submitted_at: submission.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct UserProgressDto {
    pub id: String,
    pub display_name: String,
    pub xp: i64,
}

impl From<User> for UserProgressDto {
    fn from(user: User) -> Self {
        UserProgressDto {
            id: user.id,
            display_name: user.display_name,
            xp: user.xp,
        }
    }
}
