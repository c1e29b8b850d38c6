// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod account;
pub mod fingerprint;
pub mod proxy_template;
pub mod task;
pub mod task_batch;
