// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskStatus;
use crate::domain::models::task_batch::{BatchStatus, TaskBatch};
use crate::domain::repositories::task_batch_repository::TaskBatchRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::infrastructure::database::entities::task as task_entity;
use crate::infrastructure::database::entities::task_batch as batch_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务批次仓库实现
#[derive(Clone)]
pub struct TaskBatchRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskBatchRepositoryImpl {
    /// 创建新的批次仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<batch_entity::Model> for TaskBatch {
    fn from(model: batch_entity::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            task_type: model.task_type.parse().unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            total_count: model.total_count,
            success_count: model.success_count,
            failed_count: model.failed_count,
            params: model.params,
            started_at: model.started_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
        }
    }
}

impl From<TaskBatch> for batch_entity::ActiveModel {
    fn from(batch: TaskBatch) -> Self {
        Self {
            id: Set(batch.id),
            tenant_id: Set(batch.tenant_id),
            task_type: Set(batch.task_type.to_string()),
            status: Set(batch.status.to_string()),
            total_count: Set(batch.total_count),
            success_count: Set(batch.success_count),
            failed_count: Set(batch.failed_count),
            params: Set(batch.params.clone()),
            started_at: Set(batch.started_at),
            completed_at: Set(batch.completed_at),
            created_at: Set(batch.created_at),
        }
    }
}

#[async_trait]
impl TaskBatchRepository for TaskBatchRepositoryImpl {
    async fn create(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError> {
        let model: batch_entity::ActiveModel = batch.clone().into();
        model.insert(self.db.as_ref()).await?;
        Ok(batch.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskBatch>, RepositoryError> {
        let model = batch_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError> {
        let model: batch_entity::ActiveModel = batch.clone().into();
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn mark_started(&self, id: Uuid) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        let model = batch_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if model.status == BatchStatus::Pending.to_string() {
            let mut active: batch_entity::ActiveModel = model.into();
            active.status = Set(BatchStatus::Running.to_string());
            active.started_at = Set(Some(Utc::now().into()));
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn record_outcome(
        &self,
        id: Uuid,
        success: bool,
    ) -> Result<Option<TaskBatch>, RepositoryError> {
        // Fresh transaction per sibling task, with an in-place column
        // increment: concurrent completions in one batch each add to the
        // stored value, so no increment is lost.
        let txn = self.db.begin().await?;

        let counter = if success {
            batch_entity::Column::SuccessCount
        } else {
            batch_entity::Column::FailedCount
        };
        let result = batch_entity::Entity::update_many()
            .col_expr(counter, Expr::col(counter).add(1))
            .filter(batch_entity::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.commit().await?;
            return Ok(None);
        }

        let unfinished = task_entity::Entity::find()
            .filter(task_entity::Column::BatchId.eq(id))
            .filter(task_entity::Column::Status.is_in(vec![
                TaskStatus::Pending.to_string(),
                TaskStatus::Running.to_string(),
            ]))
            .count(&txn)
            .await?;

        if unfinished == 0 {
            batch_entity::Entity::update_many()
                .col_expr(
                    batch_entity::Column::Status,
                    Expr::value(BatchStatus::Completed.to_string()),
                )
                .col_expr(
                    batch_entity::Column::CompletedAt,
                    Expr::value::<DateTime<FixedOffset>>(Utc::now().into()),
                )
                .filter(batch_entity::Column::Id.eq(id))
                .exec(&txn)
                .await?;
        }

        let model = batch_entity::Entity::find_by_id(id).one(&txn).await?;
        txn.commit().await?;

        Ok(model.map(Into::into))
    }
}
