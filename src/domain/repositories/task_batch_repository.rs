// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task_batch::TaskBatch;
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 任务批次仓库特质
#[async_trait]
pub trait TaskBatchRepository: Send + Sync {
    /// 创建批次
    async fn create(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError>;
    /// 根据ID查找批次
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskBatch>, RepositoryError>;
    /// 更新批次
    async fn update(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError>;
    /// 若批次仍为 pending 则置为 running 并写入 started_at
    async fn mark_started(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 记录一个子任务的终态结果
    ///
    /// 在独立的事务作用域内执行读取-递增-写回，并在没有子任务
    /// 处于 pending/running 时将批次置为 completed。并发完成的
    /// 兄弟任务各自走独立事务，避免丢失更新。
    async fn record_outcome(
        &self,
        id: Uuid,
        success: bool,
    ) -> Result<Option<TaskBatch>, RepositoryError>;
}
