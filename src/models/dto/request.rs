use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{
    quiz_question::TRUE_FALSE_OPTIONS, Quiz, QuizAnswer, QuizQuestion, QuizQuestionType,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, InputObject)]
#[validate(schema(function = "validate_question_input"))]
pub struct QuizQuestionInput {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    pub question_type: Option<QuizQuestionType>,
    #[graphql(default)]
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_option: Option<u32>,
    pub correct_answer_text: Option<String>,
    pub correct_number: Option<f64>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

impl From<QuizQuestionInput> for QuizQuestion {
    fn from(input: QuizQuestionInput) -> Self {
        let options = if input.question_type == Some(QuizQuestionType::TrueFalse)
            && input.options.is_empty()
        {
            TRUE_FALSE_OPTIONS.iter().map(|o| o.to_string()).collect()
        } else {
            input.options
        };

        QuizQuestion {
            prompt: input.prompt.trim().to_string(),
            question_type: input.question_type,
            options,
            correct_option: input.correct_option,
            correct_answer_text: input.correct_answer_text,
            correct_number: input.correct_number,
            explanation: input.explanation,
        }
    }
}

fn validate_question_input(input: &QuizQuestionInput) -> Result<(), ValidationError> {
    QuizQuestion::from(input.clone()).validate_shape()
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateQuizInput {
    #[validate(length(min = 1))]
    pub class_id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, message = "A quiz needs at least one question"))]
    #[validate(nested)]
    pub questions: Vec<QuizQuestionInput>,

    #[graphql(default)]
    #[serde(default)]
    pub randomize_questions: bool,

    #[graphql(default)]
    #[serde(default)]
    pub randomize_options: bool,

    #[graphql(default)]
    #[serde(default)]
    pub single_attempt: bool,

    #[validate(range(min = 1))]
    pub max_attempts: Option<u32>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0))]
    pub xp_value: Option<i64>,

    #[validate(range(min = 0))]
    pub xp_per_question: Option<i64>,

    #[graphql(default)]
    #[serde(default)]
    pub show_explanations: bool,

    #[validate(range(min = 1, max = 86400))]
    pub time_limit_secs: Option<u32>,
}

impl CreateQuizInput {
    pub fn into_quiz(self, created_by_user_id: &str) -> Quiz {
        let questions = self.questions.into_iter().map(QuizQuestion::from).collect();
        let mut quiz = Quiz::new(&self.class_id, created_by_user_id, self.title.trim(), questions);
        quiz.randomize_questions = self.randomize_questions;
        quiz.randomize_options = self.randomize_options;
        quiz.single_attempt = self.single_attempt;
        quiz.max_attempts = self.max_attempts;
        quiz.due_date = self.due_date;
        quiz.xp_value = self.xp_value;
        quiz.xp_per_question = self.xp_per_question;
        quiz.show_explanations = self.show_explanations;
        quiz.time_limit_secs = self.time_limit_secs;
        quiz
    }
}

#[derive(Debug, Clone, Deserialize, InputObject)]
pub struct SubmitQuizAttemptInput {
    pub quiz_id: String,
    /// In the order the questions were presented.
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SubmitSubmissionInput {
    #[validate(length(min = 1))]
    pub assignment_id: String,

    #[validate(length(max = 200000))]
    pub content: Option<String>,
}
