// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含系统的核心业务实体：任务、任务批次、账号、
/// 设备指纹和代理模板
pub mod account;
pub mod proxy;
pub mod task;
pub mod task_batch;
