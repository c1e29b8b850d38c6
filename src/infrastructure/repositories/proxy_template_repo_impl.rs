// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::proxy::ProxyTemplate;
use crate::domain::repositories::proxy_template_repository::ProxyTemplateRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::infrastructure::database::entities::proxy_template as proxy_entity;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

/// 代理模板仓库实现
#[derive(Clone)]
pub struct ProxyTemplateRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ProxyTemplateRepositoryImpl {
    /// 创建新的代理模板仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<proxy_entity::Model> for ProxyTemplate {
    fn from(model: proxy_entity::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            proxy_url: model.proxy_url,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl ProxyTemplateRepository for ProxyTemplateRepositoryImpl {
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<ProxyTemplate>, RepositoryError> {
        let models = proxy_entity::Entity::find()
            .filter(proxy_entity::Column::TenantId.eq(tenant_id))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(ProxyTemplate::from).collect())
    }
}
