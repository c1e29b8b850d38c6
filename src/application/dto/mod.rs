// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod account_request;
pub mod batch_response;
pub mod proxy_request;
pub mod task_request;
