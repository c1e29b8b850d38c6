// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 路由配置模块
//!
//! 定义所有API端点的路由规则

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::presentation::handlers::{
    account_handler, batch_handler, proxy_handler, task_handler,
};

/// 创建应用路由
///
/// 依赖通过 Extension 层注入，见 main 的装配代码。
pub fn create_router() -> Router {
    let task_routes = Router::new()
        .route("/v1/tasks", post(task_handler::create_task))
        .route("/v1/tasks", get(task_handler::list_tasks))
        .route("/v1/tasks/retry-failed", post(task_handler::retry_all_failed))
        .route("/v1/tasks/{id}", get(task_handler::get_task))
        .route("/v1/tasks/{id}", delete(task_handler::delete_task))
        .route("/v1/tasks/{id}/pause", post(task_handler::pause_task))
        .route("/v1/tasks/{id}/resume", post(task_handler::resume_task))
        .route("/v1/tasks/{id}/retry", post(task_handler::retry_task));

    let batch_routes = Router::new().route("/v1/batches/{id}", get(batch_handler::get_batch));

    let account_routes = Router::new()
        .route("/v1/accounts/bulk-login", post(account_handler::bulk_login))
        .route(
            "/v1/accounts/bulk-login/{job_id}",
            get(account_handler::get_bulk_login_status),
        );

    let proxy_routes = Router::new().route(
        "/v1/proxies/distribute",
        post(proxy_handler::distribute_proxies),
    );

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    Router::new()
        .merge(public_routes)
        .merge(task_routes)
        .merge(batch_routes)
        .merge(account_routes)
        .merge(proxy_routes)
}

/// 健康检查端点
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// 版本信息端点
async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": env!("CARGO_PKG_NAME")
    }))
}
