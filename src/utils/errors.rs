// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("仓库错误: {0}")]
    RepositoryError(String),

    #[error("提供方错误: {0}")]
    ProviderError(String),

    #[error("领域错误: {0}")]
    DomainError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error("未找到: {0}")]
    NotFound(String),
}

impl From<crate::domain::repositories::task_repository::RepositoryError> for WorkerError {
    fn from(e: crate::domain::repositories::task_repository::RepositoryError) -> Self {
        WorkerError::RepositoryError(e.to_string())
    }
}

impl From<crate::domain::models::task::DomainError> for WorkerError {
    fn from(e: crate::domain::models::task::DomainError) -> Self {
        WorkerError::DomainError(e.to_string())
    }
}
