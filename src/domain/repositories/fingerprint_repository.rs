// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::Fingerprint;
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 设备指纹仓库特质
#[async_trait]
pub trait FingerprintRepository: Send + Sync {
    /// 创建指纹
    async fn create(&self, fingerprint: &Fingerprint) -> Result<Fingerprint, RepositoryError>;
    /// 根据ID查找指纹
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Fingerprint>, RepositoryError>;
}
