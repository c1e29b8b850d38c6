// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 集成测试主模块
///
/// 覆盖HTTP接口与调度链路的端到端行为
mod api_tests;
mod helpers;
mod scheduler_test;
