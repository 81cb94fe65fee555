use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Client, ClientSession, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{QuizAttempt, User},
};

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Inserts the attempt and credits its XP to the student in one unit.
    /// A second attempt with the same (quiz, student, attempt number) fails
    /// with `AppError::Conflict`.
    async fn record_attempt(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn count_user_attempts(&self, student_id: &str, quiz_id: &str) -> AppResult<usize>;
    async fn find_by_user_and_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>>;
}

pub struct MongoQuizAttemptRepository {
    client: Client,
    collection: Collection<QuizAttempt>,
    users: Collection<User>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            client: db.client().clone(),
            collection: db.get_collection("quiz_attempts"),
            users: db.get_collection("users"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let attempt_number_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "student_id": 1, "attempt_number": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("quiz_student_attempt_unique".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(IndexOptions::builder().name("student_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(attempt_number_index).await?;
        self.collection.create_index(student_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

/// The write error is what the caller needs to see, not a failed abort.
async fn abort(session: &mut ClientSession) {
    if let Err(err) = session.abort_transaction().await {
        log::warn!("Failed to abort quiz attempt transaction: {}", err);
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn record_attempt(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        if let Err(err) = self.collection.insert_one(&attempt).session(&mut session).await {
            abort(&mut session).await;
            return Err(err.into());
        }

        if attempt.xp_awarded > 0 {
            let updated = self
                .users
                .update_one(
                    doc! { "id": &attempt.student_id },
                    doc! { "$inc": { "xp": attempt.xp_awarded } },
                )
                .session(&mut session)
                .await;

            match updated {
                Ok(result) if result.matched_count == 1 => {}
                Ok(_) => {
                    abort(&mut session).await;
                    return Err(AppError::NotFound(format!(
                        "User with id '{}' not found",
                        attempt.student_id
                    )));
                }
                Err(err) => {
                    abort(&mut session).await;
                    return Err(err.into());
                }
            }
        }

        session.commit_transaction().await?;
        Ok(attempt)
    }

    async fn count_user_attempts(&self, student_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "student_id": student_id,
                "quiz_id": quiz_id
            })
            .await?;
        Ok(count as usize)
    }

    async fn find_by_user_and_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! {
                "student_id": student_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }
}
