// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 批量登录请求数据传输对象
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BulkLoginRequestDto {
    /// 要登录的账号ID列表
    #[validate(length(min = 1, message = "account_ids cannot be empty"))]
    pub account_ids: Vec<Uuid>,
    /// 是否启用错峰延迟
    #[serde(default = "default_staggered")]
    pub staggered: bool,
    /// 覆盖配置的最小延迟（秒）
    pub min_delay_secs: Option<u64>,
    /// 覆盖配置的最大延迟（秒）
    pub max_delay_secs: Option<u64>,
    /// 覆盖配置的每批账号数
    pub batch_size: Option<usize>,
}

fn default_staggered() -> bool {
    true
}

/// 批量登录作业创建响应
#[derive(Debug, Serialize)]
pub struct BulkLoginStartedDto {
    pub job_id: Uuid,
    pub created: usize,
}
