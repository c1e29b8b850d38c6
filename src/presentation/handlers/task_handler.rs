// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::task_request::{
    CreateTaskRequestDto, RetryAllResponseDto, TaskInfoDto, TaskListResponseDto,
    TaskQueryRequestDto,
};
use crate::domain::models::task::Task;
use crate::domain::repositories::task_batch_repository::TaskBatchRepository;
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository,
};
use crate::presentation::errors::AppError;
use crate::presentation::extractors::tenant_id::TenantId;
use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// 创建并排期一个任务
///
/// execute_now 为 true 时忽略 scheduled_at 立即排期，
/// 否则按给定时间排期，缺省也视为立即。
pub async fn create_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    Extension(batch_repo): Extension<Arc<dyn TaskBatchRepository>>,
    TenantId(tenant_id): TenantId,
    Json(payload): Json<CreateTaskRequestDto>,
) -> Result<Json<TaskInfoDto>, AppError> {
    payload.validate()?;

    let task_type = payload
        .parse_task_type()
        .ok_or_else(|| anyhow::anyhow!("invalid task_type: {}", payload.task_type))?;

    if let Some(batch_id) = payload.batch_id {
        batch_repo
            .find_by_id(batch_id)
            .await?
            .filter(|b| b.tenant_id == tenant_id)
            .ok_or(RepositoryError::NotFound)?;
    }

    let scheduled_at = if payload.execute_now {
        Utc::now().into()
    } else {
        payload.scheduled_at.unwrap_or_else(|| Utc::now().into())
    };

    let mut task = Task::new(
        tenant_id,
        payload.account_id,
        task_type,
        payload.params.unwrap_or_else(|| json!({})),
        scheduled_at,
    );
    task.batch_id = payload.batch_id;

    let created = task_repo.create(&task).await?;
    info!(task_id = %created.id, task_type = %created.task_type, "task scheduled");
    Ok(Json(created.into()))
}

/// 查询任务列表
pub async fn list_tasks(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Query(query): Query<TaskQueryRequestDto>,
) -> Result<Json<TaskListResponseDto>, AppError> {
    let statuses = query
        .status
        .as_deref()
        .map(TaskQueryRequestDto::parse_statuses)
        .filter(|s| !s.is_empty());

    let (tasks, total) = task_repo
        .query_tasks(TaskQueryParams {
            tenant_id,
            account_id: query.account_id,
            batch_id: query.batch_id,
            task_types: None,
            statuses,
            limit: query.limit.unwrap_or(50),
            offset: query.offset.unwrap_or(0),
        })
        .await?;

    Ok(Json(TaskListResponseDto {
        tasks: tasks.into_iter().map(TaskInfoDto::from).collect(),
        total,
    }))
}

/// 查询单个任务
pub async fn get_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskInfoDto>, AppError> {
    let task = find_owned(task_repo.as_ref(), id, tenant_id).await?;
    Ok(Json(task.into()))
}

/// 暂停任务，仅 pending 可暂停
pub async fn pause_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskInfoDto>, AppError> {
    let task = find_owned(task_repo.as_ref(), id, tenant_id).await?;
    let paused = task.pause()?;
    let updated = task_repo.update(&paused).await?;
    Ok(Json(updated.into()))
}

/// 恢复任务，仅 paused 可恢复
pub async fn resume_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskInfoDto>, AppError> {
    let task = find_owned(task_repo.as_ref(), id, tenant_id).await?;
    let resumed = task.resume()?;
    let updated = task_repo.update(&resumed).await?;
    Ok(Json(updated.into()))
}

/// 重试单个失败任务
pub async fn retry_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskInfoDto>, AppError> {
    let task = find_owned(task_repo.as_ref(), id, tenant_id).await?;
    let retried = task.retry()?;
    let updated = task_repo.update(&retried).await?;
    info!(task_id = %id, "task rescheduled for retry");
    Ok(Json(updated.into()))
}

/// 批量重试租户下所有失败任务
pub async fn retry_all_failed(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
) -> Result<Json<RetryAllResponseDto>, AppError> {
    let retried = task_repo.retry_all_failed(tenant_id).await?;
    info!(tenant_id = %tenant_id, retried, "failed tasks rescheduled");
    Ok(Json(RetryAllResponseDto { retried }))
}

/// 删除任务，执行中的任务拒绝删除
pub async fn delete_task(
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    task_repo.delete(id, tenant_id).await?;
    Ok(Json(json!({ "deleted": id })))
}

async fn find_owned(
    task_repo: &dyn TaskRepository,
    id: Uuid,
    tenant_id: Uuid,
) -> Result<Task, AppError> {
    let task = task_repo
        .find_by_id(id)
        .await?
        .filter(|t| t.tenant_id == tenant_id)
        .ok_or(RepositoryError::NotFound)?;
    Ok(task)
}
