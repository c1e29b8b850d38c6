// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, AccountStatus};
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// 账号仓库特质
///
/// 核心引擎只读写账号的一小部分字段：status、proxy、
/// session 与 last_error；其余字段由外部协作方管理。
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// 根据ID查找账号
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;
    /// 根据ID列表查找账号
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, RepositoryError>;
    /// 更新账号
    async fn update(&self, account: &Account) -> Result<Account, RepositoryError>;
    /// 更新账号状态与最近错误
    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        last_error: Option<String>,
    ) -> Result<(), RepositoryError>;
    /// 持久化登录产出：会话材料、状态与登录时间
    async fn persist_session(
        &self,
        id: Uuid,
        session: serde_json::Value,
        status: AccountStatus,
    ) -> Result<(), RepositoryError>;
    /// 查询租户下代理分配的候选账号
    ///
    /// # 参数
    ///
    /// * `only_unassigned` - 为true时仅返回尚无代理的账号
    async fn find_distribution_candidates(
        &self,
        tenant_id: Uuid,
        only_unassigned: bool,
    ) -> Result<Vec<Account>, RepositoryError>;
    /// 统计每个代理URL的当前占用数，排除指定账号集合
    ///
    /// 排除集合即将被重新分配，它们占用的槽位视为已释放
    async fn proxy_usage_excluding(
        &self,
        tenant_id: Uuid,
        excluded: &[Uuid],
    ) -> Result<HashMap<String, u32>, RepositoryError>;
    /// 查询租户下持有代理且状态非 active 的账号（回收捐赠者）
    async fn find_proxy_donors(&self, tenant_id: Uuid) -> Result<Vec<Account>, RepositoryError>;
    /// 写回账号的代理分配，None 表示清除
    async fn set_proxy(&self, id: Uuid, proxy: Option<String>) -> Result<(), RepositoryError>;
}
