// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus, TaskType};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// 创建任务请求数据传输对象
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTaskRequestDto {
    /// 执行任务的账号ID
    pub account_id: Uuid,
    /// 任务类型
    #[validate(length(min = 1, message = "task_type cannot be empty"))]
    pub task_type: String,
    /// 任务参数（媒体路径、文案、目标用户等）
    pub params: Option<Value>,
    /// 计划执行时间，缺省时立即排期
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    /// 是否立即执行（忽略 scheduled_at）
    #[serde(default)]
    pub execute_now: bool,
    /// 所属批次ID（可选）
    pub batch_id: Option<Uuid>,
}

/// 任务查询请求数据传输对象
#[derive(Debug, Default, Deserialize)]
pub struct TaskQueryRequestDto {
    /// 按账号过滤
    pub account_id: Option<Uuid>,
    /// 按批次过滤
    pub batch_id: Option<Uuid>,
    /// 按状态过滤，逗号分隔
    pub status: Option<String>,
    /// 分页大小
    pub limit: Option<u64>,
    /// 分页偏移
    pub offset: Option<u64>,
}

/// 任务信息数据传输对象
#[derive(Debug, Serialize)]
pub struct TaskInfoDto {
    pub id: Uuid,
    pub account_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub task_type: String,
    pub params: Value,
    pub status: String,
    pub scheduled_at: DateTime<FixedOffset>,
    pub executed_at: Option<DateTime<FixedOffset>>,
    pub error: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Task> for TaskInfoDto {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            account_id: task.account_id,
            batch_id: task.batch_id,
            task_type: task.task_type.to_string(),
            params: task.params,
            status: task.status.to_string(),
            scheduled_at: task.scheduled_at,
            executed_at: task.executed_at,
            error: task.error,
            created_at: task.created_at,
        }
    }
}

/// 任务列表响应数据传输对象
#[derive(Debug, Serialize)]
pub struct TaskListResponseDto {
    pub tasks: Vec<TaskInfoDto>,
    pub total: u64,
}

/// 批量重试响应数据传输对象
#[derive(Debug, Serialize)]
pub struct RetryAllResponseDto {
    pub retried: u64,
}

impl CreateTaskRequestDto {
    /// 解析任务类型字符串
    pub fn parse_task_type(&self) -> Option<TaskType> {
        self.task_type.parse().ok()
    }
}

impl TaskQueryRequestDto {
    /// 解析状态过滤串为状态列表
    pub fn parse_statuses(raw: &str) -> Vec<TaskStatus> {
        raw.split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}
