// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供错误类型、错误改写、媒体路径解析、TOTP与日志初始化
pub mod error_rewrite;
pub mod errors;
pub mod media;
pub mod telemetry;
pub mod totp;
