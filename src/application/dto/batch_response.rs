// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task_batch::TaskBatch;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

/// 批次状态响应数据传输对象
///
/// 聚合计数加子任务状态汇总
#[derive(Debug, Serialize)]
pub struct BatchStatusResponseDto {
    pub id: Uuid,
    pub task_type: String,
    pub status: String,
    pub total_count: i32,
    pub success_count: i32,
    pub failed_count: i32,
    /// 仍处于 pending/running 的子任务数
    pub unfinished_count: u64,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl BatchStatusResponseDto {
    /// 从批次实体与未完成计数组装响应
    pub fn from_batch(batch: TaskBatch, unfinished_count: u64) -> Self {
        Self {
            id: batch.id,
            task_type: batch.task_type.to_string(),
            status: batch.status.to_string(),
            total_count: batch.total_count,
            success_count: batch.success_count,
            failed_count: batch.failed_count,
            unfinished_count,
            started_at: batch.started_at,
            completed_at: batch.completed_at,
            created_at: batch.created_at,
        }
    }
}
