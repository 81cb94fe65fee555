use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Classroom};

#[async_trait]
pub trait ClassroomRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Classroom>>;
}

pub struct MongoClassroomRepository {
    collection: Collection<Classroom>,
}

impl MongoClassroomRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("classrooms");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for classrooms collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(id_index).await?;

        let member_index = IndexModel::builder()
            .keys(doc! { "student_ids": 1 })
            .options(IndexOptions::builder().name("student_ids".to_string()).build())
            .build();
        self.collection.create_index(member_index).await?;

        log::info!("Successfully created indexes for classrooms collection");
        Ok(())
    }
}

#[async_trait]
impl ClassroomRepository for MongoClassroomRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Classroom>> {
        let classroom = self.collection.find_one(doc! { "id": id }).await?;
        Ok(classroom)
    }
}
