// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod account_repo_impl;
pub mod fingerprint_repo_impl;
pub mod proxy_template_repo_impl;
pub mod task_batch_repo_impl;
pub mod task_repo_impl;
