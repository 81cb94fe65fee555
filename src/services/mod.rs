pub mod attempt_session;
pub mod clock;
pub mod quiz_attempt_service;
pub mod quiz_randomizer;
pub mod quiz_service;
pub mod similarity_service;
pub mod text_fingerprint;

pub use quiz_service::QuizService;
pub use similarity_service::SimilarityService;
