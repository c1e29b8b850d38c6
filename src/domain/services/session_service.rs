// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, AccountStatus, Fingerprint, LoginMethod};
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::providers::traits::{
    LoginCredentials, ProviderClient, ProviderError, SessionProbe,
};
use crate::utils::totp;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 会话建立失败
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    MissingCredentials(String),
}

/// 会话管理器
///
/// 负责在执行任何平台动作前为账号建立可用会话。
/// 登录路径按成本递增排列：先探测已有会话，再用会话标识符
/// 快速恢复，最后才执行完整凭据登录。状态写回在每个决策点
/// 即时落库，外部协作方通过账号状态观察进度。
pub struct SessionManager {
    account_repo: Arc<dyn AccountRepository>,
}

impl SessionManager {
    /// 创建会话管理器
    pub fn new(account_repo: Arc<dyn AccountRepository>) -> Self {
        Self { account_repo }
    }

    /// 确保客户端持有可用会话
    ///
    /// 会话复用的贪婪路径：
    /// 1. 账号状态为 active 且有缓存会话时，先做一次廉价探测，
    ///    有效则直接复用，不套用设备指纹；
    /// 2. 探测失败或状态非 active 但缓存了会话标识符时，
    ///    尝试快速恢复登录；
    /// 3. 以上都不成立时执行完整凭据登录。
    ///
    /// 连接被重置类错误延迟后重试一次；两步验证码被拒时
    /// 重新生成一次再提交；人工验证与账号停用立即终止并
    /// 写回对应的账号状态。
    pub async fn ensure_session(
        &self,
        account: &Account,
        fingerprint: Option<&Fingerprint>,
        client: &mut dyn ProviderClient,
    ) -> Result<(), SessionError> {
        if account.status.is_active() && account.session.is_some() {
            match client.check_session().await {
                Ok(SessionProbe::Valid) => {
                    debug!(username = %account.username, "existing session still valid");
                    return Ok(());
                }
                Ok(SessionProbe::Expired) => {
                    info!(username = %account.username, "cached session expired, re-login");
                }
                Err(e) => {
                    warn!(username = %account.username, error = %e, "session probe failed, re-login");
                }
            }
        }

        if let Some(session_id) = account.session_id() {
            match client.resume_session(&session_id).await {
                Ok(session) => {
                    info!(username = %account.username, "session resumed from cached session id");
                    self.account_repo
                        .persist_session(account.id, session, AccountStatus::Active)
                        .await?;
                    return Ok(());
                }
                Err(e) => {
                    debug!(username = %account.username, error = %e, "session resume rejected, full login");
                }
            }
        }

        self.full_login(account, fingerprint, client).await
    }

    /// 重连后强制完整登录
    ///
    /// 执行器在任务中途收到会话失效错误时走此路径：
    /// 先完全重建客户端状态，清除所有缓存的连接与会话残留，
    /// 再无视缓存会话执行一次完整凭据登录。
    pub async fn force_full_login(
        &self,
        account: &Account,
        fingerprint: Option<&Fingerprint>,
        client: &mut dyn ProviderClient,
    ) -> Result<(), SessionError> {
        info!(username = %account.username, "reconnecting client for forced full login");
        client.reconnect().await?;
        self.full_login(account, fingerprint, client).await
    }

    async fn full_login(
        &self,
        account: &Account,
        fingerprint: Option<&Fingerprint>,
        client: &mut dyn ProviderClient,
    ) -> Result<(), SessionError> {
        let password = match &account.password_encrypted {
            Some(p) if !p.is_empty() => p.clone(),
            _ => {
                let msg = "account has no stored password".to_string();
                self.account_repo
                    .update_status(account.id, AccountStatus::Failed, Some(msg.clone()))
                    .await?;
                return Err(SessionError::MissingCredentials(msg));
            }
        };

        // Fresh login means no session is being reused, so the device
        // profile must be applied before credentials go out.
        if let Some(fp) = fingerprint {
            client.apply_fingerprint(fp);
        }

        self.account_repo
            .update_status(account.id, AccountStatus::Authenticating, None)
            .await?;

        let mut credentials = LoginCredentials {
            username: account.username.clone(),
            password,
            verification_code: self.totp_code(account),
        };

        let mut totp_regenerated = false;
        let mut reset_retried = false;
        loop {
            match client.login(&credentials).await {
                Ok(session) => {
                    info!(username = %account.username, "login succeeded");
                    self.account_repo
                        .persist_session(account.id, session, AccountStatus::Active)
                        .await?;
                    return Ok(());
                }
                Err(ProviderError::TwoFactorRequired) if !totp_regenerated => {
                    // The first code may have expired in flight. One
                    // regeneration on a fresh time step is allowed.
                    warn!(username = %account.username, "2fa code rejected, regenerating once");
                    totp_regenerated = true;
                    credentials.verification_code = self.totp_code(account);
                    if credentials.verification_code.is_none() {
                        let err = ProviderError::TwoFactorRequired;
                        self.account_repo
                            .update_status(
                                account.id,
                                AccountStatus::Failed,
                                Some(err.to_string()),
                            )
                            .await?;
                        return Err(err.into());
                    }
                }
                Err(ProviderError::ConnectionReset(msg)) if !reset_retried => {
                    warn!(username = %account.username, error = %msg, "connection reset during login, retrying once");
                    reset_retried = true;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Err(ProviderError::ChallengeRequired(msg)) => {
                    warn!(username = %account.username, "challenge required, automation halted");
                    self.account_repo
                        .update_status(
                            account.id,
                            AccountStatus::Challenge,
                            Some(msg.clone()),
                        )
                        .await?;
                    return Err(ProviderError::ChallengeRequired(msg).into());
                }
                Err(ProviderError::AccountDisabled(msg)) => {
                    warn!(username = %account.username, "account disabled upstream");
                    self.account_repo
                        .update_status(
                            account.id,
                            AccountStatus::Inactive,
                            Some(msg.clone()),
                        )
                        .await?;
                    return Err(ProviderError::AccountDisabled(msg).into());
                }
                Err(e) => {
                    warn!(username = %account.username, error = %e, "login failed");
                    self.account_repo
                        .update_status(account.id, AccountStatus::Failed, Some(e.to_string()))
                        .await?;
                    return Err(e.into());
                }
            }
        }
    }

    fn totp_code(&self, account: &Account) -> Option<String> {
        if account.login_method != LoginMethod::TwoFactor {
            return None;
        }
        let seed = account.seed_2fa.as_deref()?;
        match totp::generate_code(seed) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(username = %account.username, error = %e, "failed to generate 2fa code");
                None
            }
        }
    }
}
