#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use classroom_server::{
    app_state::{AppState, Repositories},
    auth::CallerIdentity,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{
        Assignment, Classroom, Quiz, QuizAttempt, QuizQuestion, Submission, User,
    },
    repositories::{
        AssignmentRepository, ClassroomRepository, QuizAttemptRepository, QuizRepository,
        SubmissionRepository, UserRepository,
    },
    services::clock::SystemClock,
};

pub const TEACHER: &str = "teacher@example.com";
pub const ANA: &str = "ana@example.com";
pub const BEN: &str = "ben@example.com";
pub const OUTSIDER: &str = "eve@example.com";
pub const CLASS_ID: &str = "class-bio";
pub const ASSIGNMENT_ID: &str = "essay-1";

pub fn caller(user_id: &str) -> CallerIdentity {
    CallerIdentity::new(user_id)
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: RwLock<HashMap<String, Quiz>>,
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) {
            return Err(AppError::AlreadyExists(format!("Quiz {}", quiz.id)));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }
}

/// Attempts and user XP behind one lock, so a write is all-or-nothing like
/// the Mongo transaction.
#[derive(Default)]
pub struct AttemptStore {
    pub attempts: Vec<QuizAttempt>,
    pub users: HashMap<String, User>,
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    pub store: Arc<RwLock<AttemptStore>>,
    /// Each pending race lets a phantom writer take the attempt number first.
    pending_races: AtomicUsize,
    pending_failures: AtomicUsize,
}

impl InMemoryQuizAttemptRepository {
    pub fn race_next_writes(&self, count: usize) {
        self.pending_races.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn insert(store: &mut AttemptStore, attempt: QuizAttempt) -> AppResult<()> {
        let taken = store.attempts.iter().any(|a| {
            a.quiz_id == attempt.quiz_id
                && a.student_id == attempt.student_id
                && a.attempt_number == attempt.attempt_number
        });
        if taken {
            return Err(AppError::Conflict(format!(
                "Attempt {} already recorded",
                attempt.attempt_number
            )));
        }

        if attempt.xp_awarded > 0 {
            let user = store
                .users
                .get_mut(&attempt.student_id)
                .ok_or_else(|| AppError::NotFound(format!("User {}", attempt.student_id)))?;
            user.xp += attempt.xp_awarded;
        }
        store.attempts.push(attempt);
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn record_attempt(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut store = self.store.write().await;

        if Self::take(&self.pending_failures) {
            return Err(AppError::DatabaseError("connection reset".to_string()));
        }
        if Self::take(&self.pending_races) {
            let phantom = QuizAttempt {
                id: Uuid::new_v4().to_string(),
                ..attempt.clone()
            };
            Self::insert(&mut store, phantom)?;
        }

        Self::insert(&mut store, attempt.clone())?;
        Ok(attempt)
    }

    async fn count_user_attempts(&self, student_id: &str, quiz_id: &str) -> AppResult<usize> {
        let store = self.store.read().await;
        Ok(store
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id && a.quiz_id == quiz_id)
            .count())
    }

    async fn find_by_user_and_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let store = self.store.read().await;
        let mut attempts: Vec<QuizAttempt> = store
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }
}

/// Reads users from the attempt store so XP credited by attempts is visible.
pub struct InMemoryUserRepository {
    store: Arc<RwLock<AttemptStore>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.store.read().await.users.get(id).cloned())
    }
}

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: RwLock<Vec<Submission>>,
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .iter()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn count_by_student_and_assignment(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> AppResult<usize> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .iter()
            .filter(|s| s.student_id == student_id && s.assignment_id == assignment_id)
            .count())
    }

    async fn create(&self, submission: Submission) -> AppResult<Submission> {
        self.submissions.write().await.push(submission.clone());
        Ok(submission)
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: RwLock<HashMap<String, Assignment>>,
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Assignment>> {
        Ok(self.assignments.read().await.get(id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryClassroomRepository {
    classrooms: RwLock<HashMap<String, Classroom>>,
}

#[async_trait]
impl ClassroomRepository for InMemoryClassroomRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Classroom>> {
        Ok(self.classrooms.read().await.get(id).cloned())
    }
}

/// A seeded classroom: one teacher, two students, one assignment.
pub struct TestWorld {
    pub state: AppState,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub attempts: Arc<InMemoryQuizAttemptRepository>,
    pub submissions: Arc<InMemorySubmissionRepository>,
}

impl TestWorld {
    pub async fn new() -> Self {
        let quizzes = Arc::new(InMemoryQuizRepository::default());
        let attempts = Arc::new(InMemoryQuizAttemptRepository::default());
        let submissions = Arc::new(InMemorySubmissionRepository::default());
        let assignments = Arc::new(InMemoryAssignmentRepository::default());
        let classrooms = Arc::new(InMemoryClassroomRepository::default());
        let users = Arc::new(InMemoryUserRepository {
            store: Arc::clone(&attempts.store),
        });

        {
            let mut store = attempts.store.write().await;
            for (id, name) in [(TEACHER, "Ms Teacher"), (ANA, "Ana"), (BEN, "Ben"), (OUTSIDER, "Eve")] {
                store.users.insert(id.to_string(), User::new(id, name));
            }
        }
        classrooms.classrooms.write().await.insert(
            CLASS_ID.to_string(),
            Classroom {
                id: CLASS_ID.to_string(),
                name: "Biology".to_string(),
                teacher_id: TEACHER.to_string(),
                student_ids: vec![ANA.to_string(), BEN.to_string()],
            },
        );
        assignments.assignments.write().await.insert(
            ASSIGNMENT_ID.to_string(),
            Assignment {
                id: ASSIGNMENT_ID.to_string(),
                class_id: CLASS_ID.to_string(),
                title: "Photosynthesis essay".to_string(),
                due_date: None,
            },
        );

        let repositories = Repositories {
            quizzes: quizzes.clone(),
            attempts: attempts.clone(),
            submissions: submissions.clone(),
            assignments,
            classrooms,
            users,
        };
        let state = AppState::from_repositories(
            Config::test_config(),
            repositories,
            Arc::new(SystemClock),
        );

        TestWorld {
            state,
            quizzes,
            attempts,
            submissions,
        }
    }

    pub async fn add_quiz(&self, quiz: Quiz) -> Quiz {
        self.quizzes.create(quiz).await.expect("seed quiz")
    }

    pub async fn xp_of(&self, user_id: &str) -> i64 {
        self.attempts
            .store
            .read()
            .await
            .users
            .get(user_id)
            .map(|u| u.xp)
            .unwrap_or_default()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.store.read().await.attempts.len()
    }
}

pub fn capitals_quiz() -> Quiz {
    Quiz::new(
        CLASS_ID,
        TEACHER,
        "Capitals",
        vec![
            QuizQuestion::multiple_choice("Capital of France", &["Lyon", "Paris", "Nice"], 1)
                .with_explanation("Paris has been the capital since 987"),
            QuizQuestion::true_false("Canberra is the capital of Australia", true),
            QuizQuestion::short_text("Capital of Japan", "Tokyo"),
            QuizQuestion::numeric("How many capitals does South Africa have?", 3.0),
        ],
    )
}
