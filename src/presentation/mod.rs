// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 表现层模块
//!
//! 负责处理HTTP请求和响应，包含：
//! - errors: 统一错误响应
//! - extractors: 请求提取器
//! - handlers: 请求处理器
//! - routes: 路由配置

pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod routes;
