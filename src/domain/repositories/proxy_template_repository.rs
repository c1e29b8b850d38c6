// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::proxy::ProxyTemplate;
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 代理模板仓库特质
///
/// 模板的增删由外部协作方管理，引擎只读取。
#[async_trait]
pub trait ProxyTemplateRepository: Send + Sync {
    /// 查询租户下全部代理模板
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<ProxyTemplate>, RepositoryError>;
}
