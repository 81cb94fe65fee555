use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        AssignmentRepository, ClassroomRepository, MongoAssignmentRepository,
        MongoClassroomRepository, MongoQuizAttemptRepository, MongoQuizRepository,
        MongoSubmissionRepository, MongoUserRepository, QuizAttemptRepository, QuizRepository,
        SubmissionRepository, UserRepository,
    },
    services::{
        clock::{Clock, SystemClock},
        quiz_attempt_service::QuizAttemptService,
        similarity_service::SimilaritySettings,
        QuizService, SimilarityService,
    },
};

/// Storage behind the services; Mongo in production, in-memory in tests.
#[derive(Clone)]
pub struct Repositories {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub classrooms: Arc<dyn ClassroomRepository>,
    pub users: Arc<dyn UserRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<QuizService>,
    pub similarity_service: Arc<SimilarityService>,
    pub users: Arc<dyn UserRepository>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let quizzes = Arc::new(MongoQuizRepository::new(&db));
        quizzes.ensure_indexes().await?;
        let attempts = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempts.ensure_indexes().await?;
        let submissions = Arc::new(MongoSubmissionRepository::new(&db));
        submissions.ensure_indexes().await?;
        let assignments = Arc::new(MongoAssignmentRepository::new(&db));
        assignments.ensure_indexes().await?;
        let classrooms = Arc::new(MongoClassroomRepository::new(&db));
        classrooms.ensure_indexes().await?;
        let users = Arc::new(MongoUserRepository::new(&db));
        users.ensure_indexes().await?;

        let repositories = Repositories {
            quizzes,
            attempts,
            submissions,
            assignments,
            classrooms,
            users,
        };

        let mut state = Self::from_repositories(config, repositories, Arc::new(SystemClock));
        state.db = Some(db);
        Ok(state)
    }

    pub fn from_repositories(
        config: Config,
        repositories: Repositories,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let grader = QuizAttemptService::new(clock, config.default_xp_per_question);
        let quiz_service = Arc::new(QuizService::new(
            repositories.quizzes,
            repositories.attempts,
            Arc::clone(&repositories.classrooms),
            grader,
        ));

        let settings = SimilaritySettings {
            shingle_size: config.shingle_size,
            top_k: config.similarity_top_k,
            sample_limit: config.overlap_sample_limit,
        };
        let similarity_service = Arc::new(SimilarityService::new(
            repositories.submissions,
            repositories.assignments,
            repositories.classrooms,
            settings,
        ));

        Self {
            quiz_service,
            similarity_service,
            users: repositories.users,
            db: None,
            config: Arc::new(config),
        }
    }
}
