// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! HTTP请求处理器模块
//!
//! 包含所有API端点的请求处理逻辑

pub mod account_handler;
pub mod batch_handler;
pub mod proxy_handler;
pub mod task_handler;
