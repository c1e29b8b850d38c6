// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::batch_response::BatchStatusResponseDto;
use crate::domain::repositories::task_batch_repository::TaskBatchRepository;
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use crate::presentation::errors::AppError;
use crate::presentation::extractors::tenant_id::TenantId;
use axum::extract::{Extension, Path};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// 查询批次进度
///
/// 返回批次计数器以及仍未结束的子任务数。
pub async fn get_batch(
    Extension(batch_repo): Extension<Arc<dyn TaskBatchRepository>>,
    Extension(task_repo): Extension<Arc<dyn TaskRepository>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchStatusResponseDto>, AppError> {
    let batch = batch_repo
        .find_by_id(id)
        .await?
        .filter(|b| b.tenant_id == tenant_id)
        .ok_or(RepositoryError::NotFound)?;

    let unfinished = task_repo.count_unfinished_in_batch(id).await?;
    Ok(Json(BatchStatusResponseDto::from_batch(batch, unfinished)))
}
