// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod batch_service;
pub mod fingerprint_service;
pub mod proxy_service;
pub mod session_service;
