pub mod classroom;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod submission;
pub mod user;
pub use classroom::Classroom;
pub use quiz::Quiz;
pub use quiz_attempt::{QuizAnswer, QuizAttempt};
pub use quiz_question::{QuizQuestion, QuizQuestionType};
pub use submission::{Assignment, Submission};
pub use user::User;
