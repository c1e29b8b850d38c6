// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::task_repository::TaskRepository;
use crate::queue::governor::ConcurrencyGovernor;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration as TokioDuration, MissedTickBehavior};
use tracing::{debug, error, info};

/// 调度循环
///
/// 定时扫描到期任务并交给并发调节器派发。扫描本身只做一次
/// 数据库查询与若干次非阻塞派发，执行单元的耗时永远不会拖慢
/// 下一次扫描。固定间隔轮询是有意的简化，调度延迟以轮询间隔
/// 为上界。
pub struct SchedulerLoop {
    task_repo: Arc<dyn TaskRepository>,
    governor: Arc<ConcurrencyGovernor>,
    poll_interval: TokioDuration,
}

impl SchedulerLoop {
    /// 创建调度循环
    ///
    /// # 参数
    ///
    /// * `task_repo` - 任务仓库
    /// * `governor` - 并发调节器
    /// * `poll_interval_secs` - 扫描间隔（秒）
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        governor: Arc<ConcurrencyGovernor>,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            task_repo,
            governor,
            poll_interval: TokioDuration::from_secs(poll_interval_secs),
        }
    }

    /// 启动调度循环后台任务
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(&self) -> JoinHandle<()> {
        let task_repo = self.task_repo.clone();
        let governor = self.governor.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            info!(interval_secs = poll_interval.as_secs(), "scheduler loop started");
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match task_repo.find_due(Utc::now().into()).await {
                    Ok(due) => {
                        if due.is_empty() {
                            debug!("scheduler tick, no due tasks");
                            continue;
                        }
                        info!(count = due.len(), "dispatching due tasks");
                        metrics::counter!("postrs_tasks_dispatched_total")
                            .increment(due.len() as u64);
                        for task in due {
                            // Fire and forget. The governor's semaphore
                            // bounds how many actually run.
                            governor.dispatch(task);
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to scan for due tasks");
                    }
                }
            }
        })
    }
}
