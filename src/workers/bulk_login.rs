// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, Fingerprint};
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use crate::domain::services::fingerprint_service::FingerprintService;
use crate::domain::services::session_service::SessionManager;
use crate::providers::traits::ProviderClientFactory;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 批量登录运行配置
#[derive(Debug, Clone)]
pub struct BulkLoginConfig {
    /// 是否启用错峰延迟
    pub staggered: bool,
    /// 错峰最小延迟（秒）
    pub min_delay_secs: u64,
    /// 错峰最大延迟（秒）
    pub max_delay_secs: u64,
    /// 每批账号数
    pub batch_size: usize,
}

/// 单个账号的登录结果
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub account_id: Uuid,
    pub username: String,
    pub success: bool,
    pub error: Option<String>,
}

/// 作业计数器快照
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub created: usize,
    pub logged_in: usize,
    pub login_failed: usize,
    pub pending_login: usize,
    pub results: Vec<LoginOutcome>,
}

struct JobState {
    created: usize,
    logged_in: usize,
    login_failed: usize,
    results: Vec<LoginOutcome>,
    finished_at: Option<Instant>,
}

impl JobState {
    fn pending(&self) -> usize {
        self.created - self.logged_in - self.login_failed
    }
}

/// 进程级批量登录作业注册表
///
/// 并发安全的键值映射，按作业ID存放增量更新的计数器。
/// 已结束的作业保留一段时间供轮询方读取，后台清扫周期性
/// 淘汰超过保留期的条目，注册表因此有界。进程重启丢失
/// 全部作业状态，调用方须重新发起。
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobState>,
    retention: Duration,
}

impl JobRegistry {
    /// 创建注册表
    ///
    /// # 参数
    ///
    /// * `retention_secs` - 已结束作业的保留时间（秒）
    pub fn new(retention_secs: u64) -> Self {
        Self {
            jobs: DashMap::new(),
            retention: Duration::from_secs(retention_secs),
        }
    }

    /// 登记一个新作业
    pub fn create_job(&self, created: usize) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs.insert(
            job_id,
            JobState {
                created,
                logged_in: 0,
                login_failed: 0,
                results: Vec::with_capacity(created),
                finished_at: None,
            },
        );
        job_id
    }

    /// 记录一个账号的登录结果
    pub fn record(&self, job_id: Uuid, outcome: LoginOutcome) {
        if let Some(mut state) = self.jobs.get_mut(&job_id) {
            if outcome.success {
                state.logged_in += 1;
            } else {
                state.login_failed += 1;
            }
            state.results.push(outcome);
            if state.pending() == 0 {
                state.finished_at = Some(Instant::now());
            }
        }
    }

    /// 读取作业快照
    pub fn snapshot(&self, job_id: Uuid) -> Option<JobSnapshot> {
        self.jobs.get(&job_id).map(|state| JobSnapshot {
            job_id,
            created: state.created,
            logged_in: state.logged_in,
            login_failed: state.login_failed,
            pending_login: state.pending(),
            results: state.results.clone(),
        })
    }

    /// 淘汰超过保留期的已结束作业，返回淘汰数量
    pub fn sweep(&self) -> usize {
        let retention = self.retention;
        let before = self.jobs.len();
        self.jobs.retain(|_, state| match state.finished_at {
            Some(finished) => finished.elapsed() < retention,
            None => true,
        });
        before - self.jobs.len()
    }

    /// 启动周期性清扫的后台任务
    pub fn start_sweeper(self: &Arc<Self>, interval_secs: u64) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                let evicted = registry.sweep();
                if evicted > 0 {
                    debug!(evicted, "evicted expired bulk login jobs");
                }
            }
        })
    }
}

/// 计算批内第 position 个账号的错峰延迟
///
/// 基础延迟均匀取自 [min,max]，再叠加与批内位置成正比的
/// 小抖动项，让同批账号的登录时刻彼此错开。
pub fn stagger_delay<R: Rng + ?Sized>(
    min_delay_secs: u64,
    max_delay_secs: u64,
    position: usize,
    rng: &mut R,
) -> Duration {
    let base = rng.random_range(min_delay_secs..=max_delay_secs.max(min_delay_secs));
    let jitter = rng.random_range(0..=5) * (position as u64 + 1);
    Duration::from_secs(base + jitter)
}

/// 批间延迟，均匀取自 [2·min, 2·max]
pub fn batch_delay<R: Rng + ?Sized>(
    min_delay_secs: u64,
    max_delay_secs: u64,
    rng: &mut R,
) -> Duration {
    let low = min_delay_secs * 2;
    let high = (max_delay_secs * 2).max(low);
    Duration::from_secs(rng.random_range(low..=high))
}

/// 批量登录运行器
///
/// 按固定大小分批处理账号ID列表，每个账号走与任务执行器
/// 相同的会话建立路径。计数器随每次登录落定即时更新，
/// 调用方通过注册表轮询进度。
pub struct BulkLoginRunner {
    account_repo: Arc<dyn AccountRepository>,
    fingerprint_service: Arc<FingerprintService>,
    session_manager: Arc<SessionManager>,
    client_factory: Arc<dyn ProviderClientFactory>,
    registry: Arc<JobRegistry>,
}

impl BulkLoginRunner {
    /// 创建批量登录运行器
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        fingerprint_service: Arc<FingerprintService>,
        session_manager: Arc<SessionManager>,
        client_factory: Arc<dyn ProviderClientFactory>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            account_repo,
            fingerprint_service,
            session_manager,
            client_factory,
            registry,
        }
    }

    /// 作业注册表
    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// 执行一个批量登录作业
    ///
    /// 顺序处理每个批次，错峰启用时在账号间与批次间插入
    /// 随机等待。单个账号的失败只计入计数器，不影响后续账号。
    pub async fn run(&self, job_id: Uuid, account_ids: Vec<Uuid>, config: BulkLoginConfig) {
        info!(
            job_id = %job_id,
            accounts = account_ids.len(),
            batch_size = config.batch_size,
            staggered = config.staggered,
            "bulk login job started"
        );

        let batch_size = config.batch_size.max(1);
        let batch_count = account_ids.len().div_ceil(batch_size);
        for (batch_index, batch) in account_ids.chunks(batch_size).enumerate() {
            for (position, &account_id) in batch.iter().enumerate() {
                if config.staggered {
                    let delay = {
                        let mut rng = rand::rng();
                        stagger_delay(
                            config.min_delay_secs,
                            config.max_delay_secs,
                            position,
                            &mut rng,
                        )
                    };
                    debug!(job_id = %job_id, account_id = %account_id, delay_secs = delay.as_secs(), "staggering login");
                    tokio::time::sleep(delay).await;
                }

                let outcome = self.login_one(account_id).await;
                if !outcome.success {
                    warn!(
                        job_id = %job_id,
                        account_id = %account_id,
                        error = outcome.error.as_deref().unwrap_or("unknown"),
                        "bulk login attempt failed"
                    );
                }
                self.registry.record(job_id, outcome);
            }

            if config.staggered && batch_index + 1 < batch_count {
                let delay = {
                    let mut rng = rand::rng();
                    batch_delay(config.min_delay_secs, config.max_delay_secs, &mut rng)
                };
                debug!(job_id = %job_id, delay_secs = delay.as_secs(), "waiting between batches");
                tokio::time::sleep(delay).await;
            }
        }

        info!(job_id = %job_id, "bulk login job finished");
    }

    async fn login_one(&self, account_id: Uuid) -> LoginOutcome {
        let mut account = match self.account_repo.find_by_id(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                return LoginOutcome {
                    account_id,
                    username: String::new(),
                    success: false,
                    error: Some("account not found".to_string()),
                }
            }
            Err(e) => {
                return LoginOutcome {
                    account_id,
                    username: String::new(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        // Accounts imported without a device profile get one on first login.
        let fingerprint = match self.ensure_fingerprint(&mut account).await {
            Ok(fp) => fp,
            Err(e) => {
                return LoginOutcome {
                    account_id,
                    username: account.username,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        let mut client = match self.client_factory.create(&account) {
            Ok(client) => client,
            Err(e) => {
                return LoginOutcome {
                    account_id,
                    username: account.username,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        match self
            .session_manager
            .ensure_session(&account, fingerprint.as_ref(), client.as_mut())
            .await
        {
            Ok(()) => LoginOutcome {
                account_id,
                username: account.username,
                success: true,
                error: None,
            },
            Err(e) => LoginOutcome {
                account_id,
                username: account.username,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    async fn ensure_fingerprint(
        &self,
        account: &mut Account,
    ) -> Result<Option<Fingerprint>, RepositoryError> {
        if let Some(fid) = account.fingerprint_id {
            return self.fingerprint_service.get_fingerprint(fid).await;
        }
        let fingerprint = self
            .fingerprint_service
            .create_fingerprint(account.tenant_id)
            .await?;
        debug!(account_id = %account.id, fingerprint_id = %fingerprint.id, "generated fingerprint for account");
        account.fingerprint_id = Some(fingerprint.id);
        self.account_repo.update(account).await?;
        Ok(Some(fingerprint))
    }
}
