// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 任务实体
///
/// 表示针对某个账号的一次已排期的自动化动作，例如发布内容、
/// 点赞、关注或浏览。任务具有状态机、排期时间和可选的所属批次。
/// 任务在运行期间只能由执行器修改，对外部接口不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 所属租户ID，用于权限隔离
    pub tenant_id: Uuid,
    /// 执行该任务的账号ID
    pub account_id: Uuid,
    /// 所属批次ID（可选）
    pub batch_id: Option<Uuid>,
    /// 任务类型，决定分发到哪个动作
    pub task_type: TaskType,
    /// 任务参数，按类型包含媒体路径、文案、目标用户等字段
    pub params: serde_json::Value,
    /// 任务状态
    pub status: TaskStatus,
    /// 计划执行时间
    pub scheduled_at: DateTime<FixedOffset>,
    /// 实际执行完成时间，进入终态时写入一次
    pub executed_at: Option<DateTime<FixedOffset>>,
    /// 错误信息，面向操作者的截断文本
    pub error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 任务类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 发布图文帖子
    #[default]
    Post,
    /// 发布短视频
    Reels,
    /// 发布限时动态
    Story,
    /// 点赞目标媒体
    Like,
    /// 关注目标用户
    Follow,
    /// 浏览目标动态
    View,
    /// 仅执行登录（批量导入复用）
    Login,
    /// 仅校验会话有效性
    CheckSession,
}

impl TaskType {
    /// 判断该类型是否为内容发布类任务
    ///
    /// 发布类任务在分发前需要执行一次预热请求以稳定会话
    pub fn is_publish(&self) -> bool {
        matches!(self, TaskType::Post | TaskType::Reels | TaskType::Story)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskType::Post => write!(f, "post"),
            TaskType::Reels => write!(f, "reels"),
            TaskType::Story => write!(f, "story"),
            TaskType::Like => write!(f, "like"),
            TaskType::Follow => write!(f, "follow"),
            TaskType::View => write!(f, "view"),
            TaskType::Login => write!(f, "login"),
            TaskType::CheckSession => write!(f, "check_session"),
        }
    }
}

impl FromStr for TaskType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(TaskType::Post),
            "reels" => Ok(TaskType::Reels),
            "story" => Ok(TaskType::Story),
            "like" => Ok(TaskType::Like),
            "follow" => Ok(TaskType::Follow),
            "view" => Ok(TaskType::View),
            "login" => Ok(TaskType::Login),
            "check_session" => Ok(TaskType::CheckSession),
            _ => Err(()),
        }
    }
}

/// 任务状态枚举
///
/// 合法的状态转换：
/// Pending → Running → Completed/Failed
/// Pending ↔ Paused（仅操作者）
/// Failed → Pending（仅显式重试）
///
/// 不存在其他转换，特别是 Running 永远不会隐式回到 Pending。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 待执行，等待调度器扫描
    #[default]
    Pending,
    /// 执行中，对外部接口不可变
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已暂停，调度器忽略
    Paused,
}

impl TaskStatus {
    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "paused" => Ok(TaskStatus::Paused),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合状态机规则时发生
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 验证错误，当输入数据不符合领域规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Task {
    /// 创建一个新的待执行任务
    ///
    /// # 参数
    ///
    /// * `tenant_id` - 所属租户ID
    /// * `account_id` - 执行账号ID
    /// * `task_type` - 任务类型
    /// * `params` - 任务参数
    /// * `scheduled_at` - 计划执行时间
    ///
    /// # 返回值
    ///
    /// 返回新创建的任务实例
    pub fn new(
        tenant_id: Uuid,
        account_id: Uuid,
        task_type: TaskType,
        params: serde_json::Value,
        scheduled_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            account_id,
            batch_id: None,
            task_type,
            params,
            status: TaskStatus::Pending,
            scheduled_at,
            executed_at: None,
            error: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    /// 启动任务，Pending → Running
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending => {
                self.status = TaskStatus::Running;
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成任务，Running → Completed
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Completed;
                self.executed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记任务失败，Running → Failed
    ///
    /// # 参数
    ///
    /// * `error` - 已经过改写和截断的错误信息
    pub fn fail(mut self, error: String) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Failed;
                self.executed_at = Some(Utc::now().into());
                self.error = Some(error);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 暂停任务，Pending → Paused（仅操作者）
    pub fn pause(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending => {
                self.status = TaskStatus::Paused;
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 恢复任务，Paused → Pending
    pub fn resume(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Paused => {
                self.status = TaskStatus::Pending;
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 重试任务，Failed → Pending（仅显式操作）
    ///
    /// 清除上一次的错误与执行时间并立即重新排期
    pub fn retry(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Failed => {
                self.status = TaskStatus::Pending;
                self.error = None;
                self.executed_at = None;
                self.scheduled_at = Utc::now().into();
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }
}
