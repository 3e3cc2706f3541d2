use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::entity::recordings::{self, Entity as Recordings};

pub type Recording = recordings::Model;

/// Recording rows. Every error is an engine failure and is never retried here.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Id and creation time are assigned by the store
    async fn insert(&self, filename: &str, filepath: &str, filesize: i64) -> Result<Recording>;
    /// Newest first
    async fn list_all(&self) -> Result<Vec<Recording>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Recording>>;
    /// `false` when no row had this id
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
}

#[derive(Clone)]
pub struct RecordingsService {
    db: DatabaseConnection,
}

impl RecordingsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for RecordingsService {
    async fn insert(&self, filename: &str, filepath: &str, filesize: i64) -> Result<Recording> {
        let am = recordings::ActiveModel {
            filename: Set(filename.to_string()),
            filepath: Set(filepath.to_string()),
            filesize: Set(filesize),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(am.insert(&self.db).await?)
    }

    async fn list_all(&self) -> Result<Vec<Recording>> {
        // Uploads inside one clock tick share created_at, id keeps them in order
        Ok(Recordings::find()
            .order_by_desc(recordings::Column::CreatedAt)
            .order_by_desc(recordings::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recording>> {
        Ok(Recordings::find_by_id(id).one(&self.db).await?)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let res = Recordings::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}
