// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义领域层的数据访问接口，具体实现位于 infrastructure 层
pub mod account_repository;
pub mod fingerprint_repository;
pub mod proxy_template_repository;
pub mod task_batch_repository;
pub mod task_repository;
