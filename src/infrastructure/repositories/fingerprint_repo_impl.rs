// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::Fingerprint;
use crate::domain::repositories::fingerprint_repository::FingerprintRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::infrastructure::database::entities::fingerprint as fingerprint_entity;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// 设备指纹仓库实现
#[derive(Clone)]
pub struct FingerprintRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl FingerprintRepositoryImpl {
    /// 创建新的指纹仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<fingerprint_entity::Model> for Fingerprint {
    fn from(model: fingerprint_entity::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            user_agent: model.user_agent,
            app_version: model.app_version,
            os_version: model.os_version,
            screen_resolution: model.screen_resolution,
            device: model.device,
            created_at: model.created_at,
        }
    }
}

impl From<Fingerprint> for fingerprint_entity::ActiveModel {
    fn from(fingerprint: Fingerprint) -> Self {
        Self {
            id: Set(fingerprint.id),
            tenant_id: Set(fingerprint.tenant_id),
            user_agent: Set(fingerprint.user_agent.clone()),
            app_version: Set(fingerprint.app_version.clone()),
            os_version: Set(fingerprint.os_version.clone()),
            screen_resolution: Set(fingerprint.screen_resolution.clone()),
            device: Set(fingerprint.device.clone()),
            created_at: Set(fingerprint.created_at),
        }
    }
}

#[async_trait]
impl FingerprintRepository for FingerprintRepositoryImpl {
    async fn create(&self, fingerprint: &Fingerprint) -> Result<Fingerprint, RepositoryError> {
        let model: fingerprint_entity::ActiveModel = fingerprint.clone().into();
        model.insert(self.db.as_ref()).await?;
        Ok(fingerprint.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Fingerprint>, RepositoryError> {
        let model = fingerprint_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }
}
