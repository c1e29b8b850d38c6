// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 代理分配请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
pub struct DistributeProxiesRequestDto {
    /// 为true时已有代理的账号也参与重分配
    #[serde(default)]
    pub overwrite_existing: bool,
    /// 每个代理URL的账号容量，缺省用配置值
    pub max_accounts_per_proxy: Option<u32>,
}

/// 代理分配结果响应
#[derive(Debug, Serialize)]
pub struct DistributeProxiesResponseDto {
    pub assigned_count: usize,
    pub total_candidates: usize,
}
