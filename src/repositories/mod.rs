pub mod assignment_repository;
pub mod classroom_repository;
pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod submission_repository;
pub mod user_repository;

pub use assignment_repository::{AssignmentRepository, MongoAssignmentRepository};
pub use classroom_repository::{ClassroomRepository, MongoClassroomRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use submission_repository::{MongoSubmissionRepository, SubmissionRepository};
pub use user_repository::{MongoUserRepository, UserRepository};
