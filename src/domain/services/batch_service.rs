// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task_batch::BatchStatus;
use crate::domain::repositories::task_batch_repository::TaskBatchRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 批次聚合器
///
/// 每个子任务到达终态后调用一次，无论成败。计数更新由仓库
/// 在独立的事务作用域内完成，聚合器只负责编排与可观测输出。
pub struct BatchAggregator {
    batch_repo: Arc<dyn TaskBatchRepository>,
}

impl BatchAggregator {
    /// 创建批次聚合器
    pub fn new(batch_repo: Arc<dyn TaskBatchRepository>) -> Self {
        Self { batch_repo }
    }

    /// 记录一个子任务的终态
    ///
    /// 聚合失败只记日志不上抛，批次计数偏差不应让任务本身的
    /// 终态写入失效。
    pub async fn record_outcome(&self, batch_id: Uuid, success: bool) {
        match self.batch_repo.record_outcome(batch_id, success).await {
            Ok(Some(batch)) => {
                if batch.status == BatchStatus::Completed {
                    info!(
                        batch_id = %batch_id,
                        success_count = batch.success_count,
                        failed_count = batch.failed_count,
                        total_count = batch.total_count,
                        "batch completed"
                    );
                    metrics::counter!("postrs_batches_completed_total").increment(1);
                } else {
                    debug!(
                        batch_id = %batch_id,
                        success_count = batch.success_count,
                        failed_count = batch.failed_count,
                        "batch outcome recorded"
                    );
                }
            }
            Ok(None) => {
                warn!(batch_id = %batch_id, "batch not found while recording outcome");
            }
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "failed to record batch outcome");
            }
        }
    }

    /// 若批次尚未启动则标记为 running
    pub async fn mark_started(&self, batch_id: Uuid) -> Result<(), RepositoryError> {
        self.batch_repo.mark_started(batch_id).await
    }
}
