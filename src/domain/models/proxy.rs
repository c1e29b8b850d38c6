// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 代理模板实体
///
/// 一个命名的出站代理资源。账号通过URL字符串匹配引用代理，
/// 多个模板可以携带相同的URL，分配时按唯一URL视为同一资源。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyTemplate {
    /// 模板唯一标识符
    pub id: Uuid,
    /// 所属租户ID
    pub tenant_id: Uuid,
    /// 模板名称
    pub name: String,
    /// 代理连接URL
    pub proxy_url: String,
    /// 描述（可选）
    pub description: Option<String>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}
