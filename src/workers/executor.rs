// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::AccountStatus;
use crate::domain::models::task::{Task, TaskType};
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::fingerprint_repository::FingerprintRepository;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::services::batch_service::BatchAggregator;
use crate::domain::services::session_service::SessionManager;
use crate::providers::traits::{ProviderClient, ProviderClientFactory, ProviderError};
use crate::queue::governor::TaskHandler;
use crate::utils::error_rewrite::rewrite_error;
use crate::utils::errors::WorkerError;
use crate::utils::media::resolve_media_path;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/p/|/reel/|/reels/|/tv/|/posts/)([\w-]+)").unwrap());

/// 任务执行器
///
/// 每个被认领的任务走完整的执行序列：认领置为 running、加载账号
/// 与指纹、建立会话、按类型分发动作、有界重试、写入终态、更新
/// 批次计数。执行器是唯一的错误分类边界，会话管理器与提供方
/// 客户端抛出的所有错误都在这里被归类消化，绝不外泄到并发调节器。
pub struct TaskExecutor {
    task_repo: Arc<dyn TaskRepository>,
    account_repo: Arc<dyn AccountRepository>,
    fingerprint_repo: Arc<dyn FingerprintRepository>,
    session_manager: Arc<SessionManager>,
    batch_aggregator: Arc<BatchAggregator>,
    client_factory: Arc<dyn ProviderClientFactory>,
    media_root: PathBuf,
}

impl TaskExecutor {
    /// 创建任务执行器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        account_repo: Arc<dyn AccountRepository>,
        fingerprint_repo: Arc<dyn FingerprintRepository>,
        session_manager: Arc<SessionManager>,
        batch_aggregator: Arc<BatchAggregator>,
        client_factory: Arc<dyn ProviderClientFactory>,
        media_root: PathBuf,
    ) -> Self {
        Self {
            task_repo,
            account_repo,
            fingerprint_repo,
            session_manager,
            batch_aggregator,
            client_factory,
            media_root,
        }
    }

    /// 执行一个已认领的任务并返回原始错误文本
    ///
    /// 返回的 Err 只携带未截断的原始消息，改写与截断在写终态时
    /// 统一进行。
    async fn run_claimed(&self, task: &Task) -> Result<(), String> {
        let account = self
            .account_repo
            .find_by_id(task.account_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "account not found".to_string())?;

        let fingerprint = match account.fingerprint_id {
            Some(fid) => self
                .fingerprint_repo
                .find_by_id(fid)
                .await
                .map_err(|e| e.to_string())?
                .ok_or_else(|| "fingerprint not found".to_string())?,
            None => return Err("fingerprint not found".to_string()),
        };

        let mut client = self
            .client_factory
            .create(&account)
            .map_err(|e| e.to_string())?;

        self.session_manager
            .ensure_session(&account, Some(&fingerprint), client.as_mut())
            .await
            .map_err(|e| format!("failed to establish valid session: {}", e))?;

        if task.task_type.is_publish() {
            // Harmless read before a risky publish. Failure is noise.
            if let Err(e) = client.warmup().await {
                debug!(task_id = %task.id, error = %e, "warmup failed, continuing");
            }
        }

        let mut retried = false;
        loop {
            match self.dispatch(task, client.as_mut()).await {
                Ok(()) => return Ok(()),
                Err(ProviderError::Benign(msg)) => {
                    debug!(task_id = %task.id, msg = %msg, "validation noise treated as success");
                    return Ok(());
                }
                Err(ProviderError::LoginRequired(msg)) if !retried => {
                    retried = true;
                    warn!(task_id = %task.id, msg = %msg, "session rejected mid-action, forcing full re-login");
                    self.session_manager
                        .force_full_login(&account, Some(&fingerprint), client.as_mut())
                        .await
                        .map_err(|e| {
                            format!("failed to establish valid session: {}", e)
                        })?;
                    // Let the fresh session settle before replaying.
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(ProviderError::AccountDisabled(msg)) => {
                    warn!(task_id = %task.id, account_id = %account.id, "account disabled upstream, no retry");
                    if let Err(e) = self
                        .account_repo
                        .update_status(account.id, AccountStatus::Inactive, Some(msg.clone()))
                        .await
                    {
                        warn!(account_id = %account.id, error = %e, "failed to flip account status");
                    }
                    return Err(msg);
                }
                Err(e) => return Err(e.to_string()),
            }
        }
    }

    async fn dispatch(
        &self,
        task: &Task,
        client: &mut dyn ProviderClient,
    ) -> Result<(), ProviderError> {
        match task.task_type {
            TaskType::Post => {
                let media = self.require_media(task)?;
                let caption = param_str(task, "caption").unwrap_or_default();
                let share_to_threads = param_bool(task, "share_to_threads");
                client.post_photo(&media, &caption, share_to_threads).await
            }
            TaskType::Reels => {
                let media = self.require_media(task)?;
                let caption = param_str(task, "caption").unwrap_or_default();
                let share_to_threads = param_bool(task, "share_to_threads");
                client.post_reel(&media, &caption, share_to_threads).await
            }
            TaskType::Story => {
                let media = self.require_media(task)?;
                let caption = param_str(task, "caption").unwrap_or_default();
                let link = param_str(task, "link");
                client.post_story(&media, &caption, link.as_deref()).await
            }
            TaskType::Like => self.run_like(task, client).await,
            TaskType::Follow => self.run_follow(task, client).await,
            TaskType::View => {
                let url = param_str(task, "target_url")
                    .ok_or_else(|| ProviderError::Other("missing target_url".to_string()))?;
                let story_id = client.story_id_from_url(&url).await?;
                client.view_story(&story_id).await
            }
            // Session was already established above, nothing else to do.
            TaskType::Login => Ok(()),
            TaskType::CheckSession => match client.check_session().await? {
                crate::providers::traits::SessionProbe::Valid => Ok(()),
                crate::providers::traits::SessionProbe::Expired => Err(
                    ProviderError::LoginRequired("session probe reported expired".to_string()),
                ),
            },
        }
    }

    async fn run_like(
        &self,
        task: &Task,
        client: &mut dyn ProviderClient,
    ) -> Result<(), ProviderError> {
        let url = param_str(task, "target_url")
            .ok_or_else(|| ProviderError::Other("missing target_url".to_string()))?;

        // Offline shortcode extraction avoids one provider round trip;
        // odd URL shapes fall back to the resolver endpoint.
        let media_id = match SHORTCODE_RE.captures(&url).and_then(|c| c.get(1)) {
            Some(code) => client.media_id_from_code(code.as_str()).await?,
            None => client.media_id_from_url(&url).await?,
        };

        // Browse the media first the way a real user would.
        if let Err(e) = client.media_info(&media_id).await {
            debug!(task_id = %task.id, error = %e, "media preview failed, liking anyway");
        }

        client.like_media(&media_id).await
    }

    async fn run_follow(
        &self,
        task: &Task,
        client: &mut dyn ProviderClient,
    ) -> Result<(), ProviderError> {
        let username = param_str(task, "target_username")
            .ok_or_else(|| ProviderError::Other("missing target_username".to_string()))?;

        let user_id = client.user_id_from_username(&username).await?;

        // Linger on the profile before interacting.
        let pause_ms = { rand::rng().random_range(2000..=5000) };
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;

        match client.recent_media(&user_id, 3).await {
            Ok(media) if !media.is_empty() => {
                let (roll, pick) = {
                    let mut rng = rand::rng();
                    (rng.random::<f64>(), rng.random_range(0..media.len()))
                };
                if roll < 0.6 {
                    if let Err(e) = client.media_info(&media[pick]).await {
                        debug!(error = %e, "profile media preview failed");
                    }
                    if let Err(e) = client.like_media(&media[pick]).await {
                        debug!(error = %e, "courtesy like failed, following anyway");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "failed to browse profile media");
            }
        }

        client.follow_user(&user_id).await
    }

    fn require_media(&self, task: &Task) -> Result<String, ProviderError> {
        let media_ref = param_str(task, "media_path")
            .ok_or_else(|| ProviderError::Other("missing media_path".to_string()))?;
        let resolved = resolve_media_path(&media_ref, &self.media_root)
            .ok_or_else(|| ProviderError::Other("missing media_path".to_string()))?;
        if !resolved.exists() {
            return Err(ProviderError::Other(format!(
                "media file not found: {}",
                resolved.display()
            )));
        }
        Ok(resolved.to_string_lossy().into_owned())
    }
}

fn param_str(task: &Task, key: &str) -> Option<String> {
    task.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}

fn param_bool(task: &Task, key: &str) -> bool {
    task.params
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[async_trait]
impl TaskHandler for TaskExecutor {
    /// 处理单个任务
    ///
    /// 认领失败（已被其他单元认领或状态已变）直接返回，不算错误。
    /// 终态写入与批次计数更新无论成败都会进行。
    #[instrument(skip(self, task), fields(task_id = %task.id, task_type = %task.task_type))]
    async fn handle(&self, task: Task) -> Result<(), WorkerError> {
        let claimed = match self.task_repo.claim_pending(task.id).await? {
            Some(t) => t,
            None => {
                debug!("task no longer claimable, skipping");
                return Ok(());
            }
        };

        if let Some(batch_id) = claimed.batch_id {
            if let Err(e) = self.batch_aggregator.mark_started(batch_id).await {
                warn!(batch_id = %batch_id, error = %e, "failed to mark batch started");
            }
        }

        let outcome = self.run_claimed(&claimed).await;
        let success = outcome.is_ok();

        let terminal = match outcome {
            Ok(()) => {
                info!("task completed");
                metrics::counter!("postrs_tasks_completed_total").increment(1);
                claimed.complete()?
            }
            Err(raw) => {
                warn!(error = %raw, "task failed");
                metrics::counter!("postrs_tasks_failed_total").increment(1);
                claimed.fail(rewrite_error(&raw))?
            }
        };
        self.task_repo.update(&terminal).await?;

        if let Some(batch_id) = terminal.batch_id {
            self.batch_aggregator.record_outcome(batch_id, success).await;
        }

        Ok(())
    }
}
