// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::account_request::{BulkLoginRequestDto, BulkLoginStartedDto};
use crate::config::settings::Settings;
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::presentation::errors::AppError;
use crate::presentation::extractors::tenant_id::TenantId;
use crate::workers::bulk_login::{BulkLoginConfig, BulkLoginRunner, JobSnapshot};
use axum::extract::{Extension, Path};
use axum::Json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// 发起批量登录作业
///
/// 过滤出属于当前租户的账号，注册作业后立即返回作业ID，
/// 登录在后台按错峰节奏执行。
pub async fn bulk_login(
    Extension(account_repo): Extension<Arc<dyn AccountRepository>>,
    Extension(runner): Extension<Arc<BulkLoginRunner>>,
    Extension(settings): Extension<Arc<Settings>>,
    TenantId(tenant_id): TenantId,
    Json(payload): Json<BulkLoginRequestDto>,
) -> Result<Json<BulkLoginStartedDto>, AppError> {
    payload.validate()?;

    let accounts = account_repo.find_by_ids(&payload.account_ids).await?;
    let account_ids: Vec<Uuid> = accounts
        .into_iter()
        .filter(|a| a.tenant_id == tenant_id)
        .map(|a| a.id)
        .collect();

    if account_ids.is_empty() {
        return Err(RepositoryError::NotFound.into());
    }

    let config = BulkLoginConfig {
        staggered: payload.staggered,
        min_delay_secs: payload
            .min_delay_secs
            .unwrap_or(settings.bulk_login.min_delay_secs),
        max_delay_secs: payload
            .max_delay_secs
            .unwrap_or(settings.bulk_login.max_delay_secs),
        batch_size: payload
            .batch_size
            .unwrap_or(settings.bulk_login.batch_size),
    };

    let created = account_ids.len();
    let job_id = runner.registry().create_job(created);
    info!(%job_id, accounts = created, "bulk login job started");

    let runner = runner.clone();
    tokio::spawn(async move {
        runner.run(job_id, account_ids, config).await;
    });

    Ok(Json(BulkLoginStartedDto { job_id, created }))
}

/// 查询批量登录作业进度
pub async fn get_bulk_login_status(
    Extension(runner): Extension<Arc<BulkLoginRunner>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, AppError> {
    let snapshot = runner
        .registry()
        .snapshot(job_id)
        .ok_or_else(|| anyhow::anyhow!("job not found: {job_id}"))?;
    Ok(Json(snapshot))
}
