// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::proxy_request::{
    DistributeProxiesRequestDto, DistributeProxiesResponseDto,
};
use crate::config::settings::Settings;
use crate::domain::services::proxy_service::ProxyAllocator;
use crate::presentation::errors::AppError;
use crate::presentation::extractors::tenant_id::TenantId;
use axum::extract::Extension;
use axum::Json;
use std::sync::Arc;

/// 对租户账号执行一次代理分配
pub async fn distribute_proxies(
    Extension(allocator): Extension<Arc<ProxyAllocator>>,
    Extension(settings): Extension<Arc<Settings>>,
    TenantId(tenant_id): TenantId,
    Json(payload): Json<DistributeProxiesRequestDto>,
) -> Result<Json<DistributeProxiesResponseDto>, AppError> {
    let max_accounts_per_proxy = payload
        .max_accounts_per_proxy
        .unwrap_or(settings.proxy.default_max_accounts_per_proxy);

    let summary = allocator
        .distribute(tenant_id, payload.overwrite_existing, max_accounts_per_proxy)
        .await?;

    Ok(Json(DistributeProxiesResponseDto {
        assigned_count: summary.assigned_count,
        total_candidates: summary.total_candidates,
    }))
}
