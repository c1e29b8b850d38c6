// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository,
};
use crate::infrastructure::database::entities::task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    /// 创建新的任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<task_entity::Model> for Task {
    fn from(model: task_entity::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            account_id: model.account_id,
            batch_id: model.batch_id,
            task_type: model.task_type.parse().unwrap_or_default(),
            params: model.params,
            status: model.status.parse().unwrap_or_default(),
            scheduled_at: model.scheduled_at,
            executed_at: model.executed_at,
            error: model.error,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Task> for task_entity::ActiveModel {
    fn from(task: Task) -> Self {
        Self {
            id: Set(task.id),
            tenant_id: Set(task.tenant_id),
            account_id: Set(task.account_id),
            batch_id: Set(task.batch_id),
            task_type: Set(task.task_type.to_string()),
            params: Set(task.params.clone()),
            status: Set(task.status.to_string()),
            scheduled_at: Set(task.scheduled_at),
            executed_at: Set(task.executed_at),
            error: Set(task.error.clone()),
            created_at: Set(task.created_at),
            updated_at: Set(task.updated_at),
        }
    }
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError> {
        let model: task_entity::ActiveModel = task.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let mut model: task_entity::ActiveModel = task.clone().into();
        model.updated_at = Set(Utc::now().into());

        let updated_model = model.update(self.db.as_ref()).await?;
        Ok(updated_model.into())
    }

    async fn find_due(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::Status.eq(TaskStatus::Pending.to_string()))
            .filter(task_entity::Column::ScheduledAt.lte(now))
            .order_by_asc(task_entity::Column::ScheduledAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Task::from).collect())
    }

    async fn claim_pending(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        // Guarded update: the status filter makes the pending->running
        // flip atomic, a second claimer matches zero rows.
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Running.to_string()),
            )
            .col_expr(
                task_entity::Column::UpdatedAt,
                Expr::value::<DateTime<FixedOffset>>(Utc::now().into()),
            )
            .filter(task_entity::Column::Id.eq(id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn count_unfinished_in_batch(&self, batch_id: Uuid) -> Result<u64, RepositoryError> {
        let count = task_entity::Entity::find()
            .filter(task_entity::Column::BatchId.eq(batch_id))
            .filter(task_entity::Column::Status.is_in(vec![
                TaskStatus::Pending.to_string(),
                TaskStatus::Running.to_string(),
            ]))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }

    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), RepositoryError> {
        let mut query = task_entity::Entity::find()
            .filter(task_entity::Column::TenantId.eq(params.tenant_id));

        if let Some(account_id) = params.account_id {
            query = query.filter(task_entity::Column::AccountId.eq(account_id));
        }
        if let Some(batch_id) = params.batch_id {
            query = query.filter(task_entity::Column::BatchId.eq(batch_id));
        }
        if let Some(task_types) = &params.task_types {
            query = query.filter(
                task_entity::Column::TaskType
                    .is_in(task_types.iter().map(ToString::to_string)),
            );
        }
        if let Some(statuses) = &params.statuses {
            query = query.filter(
                task_entity::Column::Status.is_in(statuses.iter().map(ToString::to_string)),
            );
        }

        let total = query.clone().count(self.db.as_ref()).await?;

        let limit = if params.limit == 0 { 50 } else { params.limit };
        let models = query
            .order_by_desc(task_entity::Column::CreatedAt)
            .offset(params.offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok((models.into_iter().map(Task::from).collect(), total))
    }

    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> Result<(), RepositoryError> {
        // Guarded delete: the status filter keeps a task claimed to
        // running between lookup and delete from being removed.
        let result = task_entity::Entity::delete_many()
            .filter(task_entity::Column::Id.eq(id))
            .filter(task_entity::Column::TenantId.eq(tenant_id))
            .filter(task_entity::Column::Status.ne(TaskStatus::Running.to_string()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return match self.find_by_id(id).await? {
                Some(t) if t.tenant_id == tenant_id && t.status == TaskStatus::Running => {
                    Err(RepositoryError::Conflict(
                        "cannot delete a running task".to_string(),
                    ))
                }
                _ => Err(RepositoryError::NotFound),
            };
        }
        Ok(())
    }

    async fn retry_all_failed(&self, tenant_id: Uuid) -> Result<u64, RepositoryError> {
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Pending.to_string()),
            )
            .col_expr(task_entity::Column::Error, Expr::value(Option::<String>::None))
            .col_expr(
                task_entity::Column::ExecutedAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(
                task_entity::Column::ScheduledAt,
                Expr::value::<DateTime<FixedOffset>>(Utc::now().into()),
            )
            .col_expr(
                task_entity::Column::UpdatedAt,
                Expr::value::<DateTime<FixedOffset>>(Utc::now().into()),
            )
            .filter(task_entity::Column::TenantId.eq(tenant_id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Failed.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::TaskType;
    use sea_orm::{ConnectionTrait, Database, Schema};
    use serde_json::json;

    async fn repo_with_schema() -> TaskRepositoryImpl {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        db.execute(backend.build(&schema.create_table_from_entity(task_entity::Entity)))
            .await
            .unwrap();
        TaskRepositoryImpl::new(Arc::new(db))
    }

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            batch_id: None,
            task_type: TaskType::Like,
            params: json!({}),
            status,
            scheduled_at: Utc::now().into(),
            executed_at: None,
            error: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_delete_refuses_running_task() {
        let repo = repo_with_schema().await;
        let t = task(TaskStatus::Running);
        repo.create(&t).await.unwrap();

        let err = repo.delete(t.id, t.tenant_id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(repo.find_by_id(t.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_pending_task() {
        let repo = repo_with_schema().await;
        let t = task(TaskStatus::Pending);
        repo.create(&t).await.unwrap();

        repo.delete(t.id, t.tenant_id).await.unwrap();
        assert!(repo.find_by_id(t.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_tenant_scoped() {
        let repo = repo_with_schema().await;
        let t = task(TaskStatus::Pending);
        repo.create(&t).await.unwrap();

        let err = repo.delete(t.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert!(repo.find_by_id(t.id).await.unwrap().is_some());
    }
}
