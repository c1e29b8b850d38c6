// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus, TaskType};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 非法操作，例如删除执行中的任务
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// 任务查询参数
#[derive(Debug, Default, Clone)]
pub struct TaskQueryParams {
    pub tenant_id: Uuid,
    pub account_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub task_types: Option<Vec<TaskType>>,
    pub statuses: Option<Vec<TaskStatus>>,
    pub limit: u64,
    pub offset: u64,
}

/// 任务仓库特质
///
/// 定义任务数据访问接口
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;
    /// 更新任务
    async fn update(&self, task: &Task) -> Result<Task, RepositoryError>;
    /// 查询所有到期的待执行任务（status=pending 且 scheduled_at <= now）
    async fn find_due(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Task>, RepositoryError>;
    /// 原子认领任务：仅当任务仍为 pending 时置为 running
    ///
    /// 返回认领后的任务；任务已被其他执行单元认领或不存在时返回 None。
    /// 这是「同一任务ID至多一个执行单元」的保证点。
    async fn claim_pending(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;
    /// 统计批次中仍处于 pending/running 的子任务数
    async fn count_unfinished_in_batch(&self, batch_id: Uuid) -> Result<u64, RepositoryError>;
    /// 高级任务查询，返回任务列表与总数
    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), RepositoryError>;
    /// 删除任务，执行中的任务拒绝删除
    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> Result<(), RepositoryError>;
    /// 批量重试租户下所有失败任务，返回重试数量
    async fn retry_all_failed(&self, tenant_id: Uuid) -> Result<u64, RepositoryError>;
}
