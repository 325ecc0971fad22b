//! [`PlanStore`] backed by the PostgreSQL `learning_paths` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use pathsmith_db::models::LearningPath;
use pathsmith_db::queries::learning_paths as queries;

use super::{NewPlanRecord, PlanStore, StoreError};

fn store_err(err: anyhow::Error) -> StoreError {
    StoreError::from_anyhow(&err)
}

#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn probe_table(&self) -> Result<(), StoreError> {
        queries::probe_table(&self.pool).await.map_err(store_err)
    }

    async fn define_provisioner(&self) -> Result<(), StoreError> {
        queries::define_provisioner(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn invoke_provisioner(&self) -> Result<(), StoreError> {
        queries::invoke_provisioner(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn insert(&self, record: NewPlanRecord<'_>) -> Result<LearningPath, StoreError> {
        let row = queries::insert_learning_path(
            &self.pool,
            record.user_id,
            record.title,
            record.description,
            record.modules,
            record.created_at,
        )
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<LearningPath>, StoreError> {
        let rows = queries::list_learning_paths_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(LearningPath::from).collect())
    }

    async fn get(&self, id: Uuid, user_id: &str) -> Result<Option<LearningPath>, StoreError> {
        let row = queries::get_learning_path(&self.pool, id, user_id)
            .await
            .map_err(store_err)?;
        Ok(row.map(LearningPath::from))
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        queries::delete_learning_path(&self.pool, id, user_id)
            .await
            .map_err(store_err)
    }
}
