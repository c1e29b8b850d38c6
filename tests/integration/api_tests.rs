// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{due_task, empty_batch, InMemoryBatchRepo, InMemoryTaskRepo};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use postrs::domain::models::task::TaskStatus;
use postrs::domain::repositories::task_batch_repository::TaskBatchRepository;
use postrs::domain::repositories::task_repository::TaskRepository;
use postrs::presentation::routes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

fn test_app(
    task_repo: Arc<InMemoryTaskRepo>,
    batch_repo: Arc<InMemoryBatchRepo>,
) -> Router {
    let task_repo: Arc<dyn TaskRepository> = task_repo;
    let batch_repo: Arc<dyn TaskBatchRepository> = batch_repo;
    routes::create_router()
        .layer(Extension(task_repo))
        .layer(Extension(batch_repo))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, tenant_id: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-tenant-id", tenant_id.to_string())
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, tenant_id: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-tenant-id", tenant_id.to_string())
        .body(Body::empty())
        .unwrap()
}

/// 健康检查测试
///
/// 验证健康检查端点是否正常工作
#[tokio::test]
async fn health_check_works() {
    let app = test_app(
        Arc::new(InMemoryTaskRepo::new()),
        Arc::new(InMemoryBatchRepo::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// 缺少租户头时任务接口返回400
#[tokio::test]
async fn create_task_requires_tenant_header() {
    let app = test_app(
        Arc::new(InMemoryTaskRepo::new()),
        Arc::new(InMemoryBatchRepo::new()),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/v1/tasks")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({
                "account_id": Uuid::new_v4(),
                "task_type": "like"
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// 创建任务后可按ID读取，初始状态为pending
#[tokio::test]
async fn create_then_fetch_task() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let app = test_app(task_repo.clone(), Arc::new(InMemoryBatchRepo::new()));
    let tenant_id = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/tasks",
            tenant_id,
            json!({
                "account_id": Uuid::new_v4(),
                "task_type": "like",
                "params": { "target_url": "https://example.com/p/abc/" },
                "execute_now": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(get_request(&format!("/v1/tasks/{id}"), tenant_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"].as_str().unwrap(), id);
    assert_eq!(fetched["task_type"], "like");
}

/// 非法任务类型被拒绝
#[tokio::test]
async fn invalid_task_type_rejected() {
    let app = test_app(
        Arc::new(InMemoryTaskRepo::new()),
        Arc::new(InMemoryBatchRepo::new()),
    );

    let response = app
        .oneshot(post_json(
            "/v1/tasks",
            Uuid::new_v4(),
            json!({
                "account_id": Uuid::new_v4(),
                "task_type": "teleport"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// 指向不存在批次的任务被拒绝
#[tokio::test]
async fn create_task_with_unknown_batch_rejected() {
    let app = test_app(
        Arc::new(InMemoryTaskRepo::new()),
        Arc::new(InMemoryBatchRepo::new()),
    );

    let response = app
        .oneshot(post_json(
            "/v1/tasks",
            Uuid::new_v4(),
            json!({
                "account_id": Uuid::new_v4(),
                "task_type": "like",
                "batch_id": Uuid::new_v4()
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// 暂停再恢复一个待执行任务
#[tokio::test]
async fn pause_then_resume_task() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let tenant_id = Uuid::new_v4();
    let task = due_task(tenant_id);
    let id = task.id;
    task_repo.seed(task);

    let app = test_app(task_repo.clone(), Arc::new(InMemoryBatchRepo::new()));

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/tasks/{id}/pause"),
            tenant_id,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(task_repo.get(id).unwrap().status, TaskStatus::Paused);

    let response = app
        .oneshot(post_json(
            &format!("/v1/tasks/{id}/resume"),
            tenant_id,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(task_repo.get(id).unwrap().status, TaskStatus::Pending);
}

/// 非法状态转换返回409
#[tokio::test]
async fn resume_pending_task_conflicts() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let tenant_id = Uuid::new_v4();
    let task = due_task(tenant_id);
    let id = task.id;
    task_repo.seed(task);

    let app = test_app(task_repo, Arc::new(InMemoryBatchRepo::new()));

    let response = app
        .oneshot(post_json(
            &format!("/v1/tasks/{id}/resume"),
            tenant_id,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// 其他租户的任务不可见
#[tokio::test]
async fn cross_tenant_task_hidden() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let task = due_task(Uuid::new_v4());
    let id = task.id;
    task_repo.seed(task);

    let app = test_app(task_repo, Arc::new(InMemoryBatchRepo::new()));

    let response = app
        .oneshot(get_request(&format!("/v1/tasks/{id}"), Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// 执行中的任务拒绝删除
#[tokio::test]
async fn delete_running_task_conflicts() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let tenant_id = Uuid::new_v4();
    let task = due_task(tenant_id).start().unwrap();
    let id = task.id;
    task_repo.seed(task);

    let app = test_app(task_repo.clone(), Arc::new(InMemoryBatchRepo::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/tasks/{id}"))
                .header("x-tenant-id", tenant_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(task_repo.get(id).is_some());
}

/// 批次查询返回计数与未完成子任务数
#[tokio::test]
async fn batch_status_rolls_up_children() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let batch_repo = Arc::new(InMemoryBatchRepo::new());
    let tenant_id = Uuid::new_v4();

    let mut batch = empty_batch(tenant_id, 2);
    batch.success_count = 1;
    let batch_id = batch.id;
    batch_repo.seed(batch);

    let mut child = due_task(tenant_id);
    child.batch_id = Some(batch_id);
    task_repo.seed(child);

    let app = test_app(task_repo, batch_repo);

    let response = app
        .oneshot(get_request(&format!("/v1/batches/{batch_id}"), tenant_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success_count"], 1);
    assert_eq!(body["unfinished_count"], 1);
}
