// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, AccountStatus};
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::infrastructure::database::entities::account as account_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 账号仓库实现
#[derive(Clone)]
pub struct AccountRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl AccountRepositoryImpl {
    /// 创建新的账号仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<account_entity::Model> for Account {
    fn from(model: account_entity::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            username: model.username,
            password_encrypted: model.password_encrypted,
            seed_2fa: model.seed_2fa,
            login_method: model.login_method.parse().unwrap_or_default(),
            proxy: model.proxy,
            fingerprint_id: model.fingerprint_id,
            session: model.session,
            status: model.status.parse().unwrap_or_default(),
            last_error: model.last_error,
            is_checker: model.is_checker,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Account> for account_entity::ActiveModel {
    fn from(account: Account) -> Self {
        Self {
            id: Set(account.id),
            tenant_id: Set(account.tenant_id),
            username: Set(account.username.clone()),
            password_encrypted: Set(account.password_encrypted.clone()),
            seed_2fa: Set(account.seed_2fa.clone()),
            login_method: Set(account.login_method.to_string()),
            proxy: Set(account.proxy.clone()),
            fingerprint_id: Set(account.fingerprint_id),
            session: Set(account.session.clone()),
            status: Set(account.status.to_string()),
            last_error: Set(account.last_error.clone()),
            is_checker: Set(account.is_checker),
            last_login: Set(account.last_login),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
    }
}

#[async_trait]
impl AccountRepository for AccountRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let model = account_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, RepositoryError> {
        let models = account_entity::Entity::find()
            .filter(account_entity::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn update(&self, account: &Account) -> Result<Account, RepositoryError> {
        let mut model: account_entity::ActiveModel = account.clone().into();
        model.updated_at = Set(Utc::now().into());
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        last_error: Option<String>,
    ) -> Result<(), RepositoryError> {
        let model = account_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: account_entity::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.last_error = Set(last_error);
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn persist_session(
        &self,
        id: Uuid,
        session: serde_json::Value,
        status: AccountStatus,
    ) -> Result<(), RepositoryError> {
        let model = account_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: account_entity::ActiveModel = model.into();
        active.session = Set(Some(session));
        active.status = Set(status.to_string());
        active.last_error = Set(None);
        active.last_login = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn find_distribution_candidates(
        &self,
        tenant_id: Uuid,
        only_unassigned: bool,
    ) -> Result<Vec<Account>, RepositoryError> {
        let mut query = account_entity::Entity::find()
            .filter(account_entity::Column::TenantId.eq(tenant_id));

        if only_unassigned {
            query = query.filter(account_entity::Column::Proxy.is_null());
        }

        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn proxy_usage_excluding(
        &self,
        tenant_id: Uuid,
        excluded: &[Uuid],
    ) -> Result<HashMap<String, u32>, RepositoryError> {
        let mut query = account_entity::Entity::find()
            .filter(account_entity::Column::TenantId.eq(tenant_id))
            .filter(account_entity::Column::Proxy.is_not_null());

        if !excluded.is_empty() {
            query = query.filter(account_entity::Column::Id.is_not_in(excluded.iter().copied()));
        }

        let models = query.all(self.db.as_ref()).await?;

        let mut usage = HashMap::new();
        for model in models {
            if let Some(proxy) = model.proxy {
                *usage.entry(proxy).or_insert(0) += 1;
            }
        }
        Ok(usage)
    }

    async fn find_proxy_donors(&self, tenant_id: Uuid) -> Result<Vec<Account>, RepositoryError> {
        let models = account_entity::Entity::find()
            .filter(account_entity::Column::TenantId.eq(tenant_id))
            .filter(account_entity::Column::Proxy.is_not_null())
            .filter(account_entity::Column::Status.ne(AccountStatus::Active.to_string()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn set_proxy(&self, id: Uuid, proxy: Option<String>) -> Result<(), RepositoryError> {
        let model = account_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: account_entity::ActiveModel = model.into();
        active.proxy = Set(proxy);
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}
