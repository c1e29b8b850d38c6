// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskType;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 任务批次实体
///
/// 表示一组同时创建的任务的聚合，维护成功/失败计数。
/// 不变量：success_count + failed_count 等于已离开
/// pending/running 的子任务数量；当没有子任务处于
/// pending/running 时批次进入 Completed。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBatch {
    /// 批次唯一标识符
    pub id: Uuid,
    /// 所属租户ID
    pub tenant_id: Uuid,
    /// 批次内任务的类型
    pub task_type: TaskType,
    /// 批次状态
    pub status: BatchStatus,
    /// 子任务总数
    pub total_count: i32,
    /// 成功子任务数
    pub success_count: i32,
    /// 失败子任务数
    pub failed_count: i32,
    /// 批次级共享参数（可选）
    pub params: Option<serde_json::Value>,
    /// 首个子任务开始执行的时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 全部子任务离开 pending/running 的时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}

/// 批次状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// 尚无子任务开始执行
    #[default]
    Pending,
    /// 至少一个子任务已开始执行
    Running,
    /// 所有子任务已离开 pending/running
    Completed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::Running => write!(f, "running"),
            BatchStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for BatchStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "running" => Ok(BatchStatus::Running),
            "completed" => Ok(BatchStatus::Completed),
            _ => Err(()),
        }
    }
}

impl TaskBatch {
    /// 创建一个新批次
    pub fn new(tenant_id: Uuid, task_type: TaskType, total_count: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            task_type,
            status: BatchStatus::Pending,
            total_count,
            success_count: 0,
            failed_count: 0,
            params: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now().into(),
        }
    }
}
