// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use crate::utils::errors::WorkerError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// 任务处理器特质
///
/// 并发调节器与具体执行逻辑之间的接缝。处理器必须把所有
/// 内部失败归结为返回值，不向外抛出。
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// 处理单个任务的完整执行
    async fn handle(&self, task: Task) -> Result<(), WorkerError>;
}

/// 并发调节器
///
/// 固定大小的信号量限制同时在飞的执行单元数。每个任务在独立的
/// tokio任务中执行，第N+1个任务在某个槽位释放前一直等待许可。
/// 单个执行单元的失败只记录日志，绝不影响兄弟单元。
pub struct ConcurrencyGovernor {
    semaphore: Arc<Semaphore>,
    handler: Arc<dyn TaskHandler>,
}

impl ConcurrencyGovernor {
    /// 创建并发调节器
    ///
    /// # 参数
    ///
    /// * `concurrency` - 同时执行的任务数上限
    /// * `handler` - 任务处理器
    pub fn new(concurrency: usize, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            handler,
        }
    }

    /// 派发一个任务去执行
    ///
    /// 立即返回句柄而不等待许可，许可在派生出的执行单元内部获取，
    /// 因此调用方（调度循环）永远不会被阻塞。
    pub fn dispatch(&self, task: Task) -> JoinHandle<()> {
        let semaphore = self.semaphore.clone();
        let handler = self.handler.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore closed, engine is shutting down.
                    warn!(task_id = %task.id, "governor closed, dropping task dispatch");
                    return;
                }
            };

            let task_id = task.id;
            metrics::gauge!("postrs_executor_busy_slots").increment(1.0);
            // The handler runs in its own task so a panic surfaces here
            // as a JoinError instead of unwinding past the gauge update.
            let outcome = tokio::spawn(async move { handler.handle(task).await }).await;
            metrics::gauge!("postrs_executor_busy_slots").decrement(1.0);
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(task_id = %task_id, error = %e, "execution unit failed");
                }
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "execution unit panicked");
                }
            }
        })
    }

    /// 当前空闲槽位数
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
