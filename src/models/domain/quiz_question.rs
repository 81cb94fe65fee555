use async_graphql::Enum;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// One question of a quiz. Which answer-key field is meaningful depends on
/// `question_type`; a missing type is read as multiple choice.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuizQuestionType>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum QuizQuestionType {
    Mcq,
    TrueFalse,
    Short,
    Numeric,
}

impl QuizQuestion {
    pub fn multiple_choice(prompt: &str, options: &[&str], correct_option: u32) -> Self {
        QuizQuestion {
            prompt: prompt.to_string(),
            question_type: Some(QuizQuestionType::Mcq),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option: Some(correct_option),
            correct_answer_text: None,
            correct_number: None,
            explanation: None,
        }
    }

    pub fn true_false(prompt: &str, answer: bool) -> Self {
        QuizQuestion {
            prompt: prompt.to_string(),
            question_type: Some(QuizQuestionType::TrueFalse),
            options: TRUE_FALSE_OPTIONS.iter().map(|o| o.to_string()).collect(),
            correct_option: Some(if answer { 0 } else { 1 }),
            correct_answer_text: None,
            correct_number: None,
            explanation: None,
        }
    }

    pub fn short_text(prompt: &str, answer: &str) -> Self {
        QuizQuestion {
            prompt: prompt.to_string(),
            question_type: Some(QuizQuestionType::Short),
            options: Vec::new(),
            correct_option: None,
            correct_answer_text: Some(answer.to_string()),
            correct_number: None,
            explanation: None,
        }
    }

    pub fn numeric(prompt: &str, answer: f64) -> Self {
        QuizQuestion {
            prompt: prompt.to_string(),
            question_type: Some(QuizQuestionType::Numeric),
            options: Vec::new(),
            correct_option: None,
            correct_answer_text: None,
            correct_number: Some(answer),
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = Some(explanation.to_string());
        self
    }

    pub fn kind(&self) -> QuizQuestionType {
        self.question_type.unwrap_or(QuizQuestionType::Mcq)
    }

    /// Whether the question presents a list of options to pick from.
    pub fn has_options(&self) -> bool {
        matches!(
            self.kind(),
            QuizQuestionType::Mcq | QuizQuestionType::TrueFalse
        )
    }

    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(shape_error("empty_prompt", "Question prompt cannot be empty"));
        }

        match self.kind() {
            QuizQuestionType::Mcq => {
                if self.options.len() < 2 {
                    return Err(shape_error(
                        "mcq_options",
                        "Multiple-choice questions need at least two options",
                    ));
                }
                if self.options.iter().any(|o| o.trim().is_empty()) {
                    return Err(shape_error(
                        "mcq_options",
                        "Multiple-choice options cannot be empty",
                    ));
                }
                match self.correct_option {
                    Some(index) if (index as usize) < self.options.len() => Ok(()),
                    _ => Err(shape_error(
                        "mcq_correct_option",
                        "Correct option must point at one of the options",
                    )),
                }
            }
            QuizQuestionType::TrueFalse => {
                if self.options != TRUE_FALSE_OPTIONS {
                    return Err(shape_error(
                        "true_false_options",
                        "True/false questions must have exactly the options True and False",
                    ));
                }
                match self.correct_option {
                    Some(0) | Some(1) => Ok(()),
                    _ => Err(shape_error(
                        "true_false_correct_option",
                        "True/false answer must be 0 (True) or 1 (False)",
                    )),
                }
            }
            QuizQuestionType::Short => match self.correct_answer_text.as_deref() {
                Some(text) if !text.trim().is_empty() => Ok(()),
                _ => Err(shape_error(
                    "short_answer",
                    "Short-answer questions need a correct answer text",
                )),
            },
            QuizQuestionType::Numeric => match self.correct_number {
                Some(value) if value.is_finite() => Ok(()),
                _ => Err(shape_error(
                    "numeric_answer",
                    "Numeric questions need a finite correct number",
                )),
            },
        }
    }
}

fn shape_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_question_type_round_trip_serialization() {
        let variants = [
            QuizQuestionType::Mcq,
            QuizQuestionType::TrueFalse,
            QuizQuestionType::Short,
            QuizQuestionType::Numeric,
        ];

        for variant in variants {
            let json = serde_json::to_string(&variant).expect("variant should serialize");
            let parsed: QuizQuestionType =
                serde_json::from_str(&json).expect("variant should deserialize");
            assert_eq!(variant, parsed);
        }
        assert_eq!(
            serde_json::to_string(&QuizQuestionType::TrueFalse).unwrap(),
            "\"true_false\""
        );
    }

    #[test]
    fn quiz_question_type_rejects_unknown_variant() {
        let parsed = serde_json::from_str::<QuizQuestionType>("\"essay\"");

        assert!(parsed.is_err());
    }

    #[test]
    fn missing_type_defaults_to_multiple_choice() {
        let question: QuizQuestion = serde_json::from_str(
            r#"{"prompt": "2 + 2?", "options": ["3", "4"], "correct_option": 1}"#,
        )
        .expect("question should deserialize");

        assert_eq!(question.question_type, None);
        assert_eq!(question.kind(), QuizQuestionType::Mcq);
        assert!(question.validate_shape().is_ok());
    }

    #[test]
    fn multiple_choice_needs_two_non_empty_options_and_valid_index() {
        assert!(QuizQuestion::multiple_choice("Pick", &["a"], 0)
            .validate_shape()
            .is_err());
        assert!(QuizQuestion::multiple_choice("Pick", &["a", " "], 0)
            .validate_shape()
            .is_err());
        assert!(QuizQuestion::multiple_choice("Pick", &["a", "b"], 2)
            .validate_shape()
            .is_err());
        assert!(QuizQuestion::multiple_choice("Pick", &["a", "b"], 1)
            .validate_shape()
            .is_ok());
    }

    #[test]
    fn true_false_has_fixed_options() {
        let question = QuizQuestion::true_false("Water is wet", true);
        assert_eq!(question.options, vec!["True", "False"]);
        assert_eq!(question.correct_option, Some(0));
        assert!(question.validate_shape().is_ok());

        let mut reordered = question.clone();
        reordered.options.reverse();
        assert!(reordered.validate_shape().is_err());
    }

    #[test]
    fn short_and_numeric_need_answer_keys() {
        assert!(QuizQuestion::short_text("Capital of France", "Paris")
            .validate_shape()
            .is_ok());
        assert!(QuizQuestion::short_text("Capital of France", "  ")
            .validate_shape()
            .is_err());
        assert!(QuizQuestion::numeric("Pi, roughly", 3.14)
            .validate_shape()
            .is_ok());
        assert!(QuizQuestion::numeric("Broken", f64::NAN)
            .validate_shape()
            .is_err());
    }
}
