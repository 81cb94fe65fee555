use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Submission};

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>>;
    async fn find_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>>;
    async fn count_by_student_and_assignment(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> AppResult<usize>;
    async fn create(&self, submission: Submission) -> AppResult<Submission>;
}

pub struct MongoSubmissionRepository {
    collection: Collection<Submission>,
}

impl MongoSubmissionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("submissions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for submissions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let assignment_index = IndexModel::builder()
            .keys(doc! { "assignment_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("assignment_student".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(assignment_index).await?;

        log::info!("Successfully created indexes for submissions collection");
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for MongoSubmissionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
        let submission = self.collection.find_one(doc! { "id": id }).await?;
        Ok(submission)
    }

    async fn find_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>> {
        let submissions: Vec<Submission> = self
            .collection
            .find(doc! { "assignment_id": assignment_id })
            .sort(doc! { "submitted_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(submissions)
    }

    async fn count_by_student_and_assignment(
        &self,
        student_id: &str,
        assignment_id: &str,
    ) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "student_id": student_id,
                "assignment_id": assignment_id
            })
            .await?;
        Ok(count as usize)
    }

    async fn create(&self, submission: Submission) -> AppResult<Submission> {
        self.collection.insert_one(&submission).await?;
        Ok(submission)
    }
}
