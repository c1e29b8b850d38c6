// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 提供方模块
///
/// 对外部社交平台能力接口的抽象与默认实现
pub mod rest_client;
pub mod traits;
