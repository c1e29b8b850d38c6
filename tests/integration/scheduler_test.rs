// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{due_task, InMemoryTaskRepo};
use async_trait::async_trait;
use postrs::domain::models::task::{Task, TaskStatus};
use postrs::domain::repositories::task_repository::TaskRepository;
use postrs::queue::governor::{ConcurrencyGovernor, TaskHandler};
use postrs::queue::scheduler::SchedulerLoop;
use postrs::utils::errors::WorkerError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 认领后慢速执行的处理器
///
/// 认领成功才计入并发，模拟执行器的原子认领语义。
struct ClaimingHandler {
    task_repo: Arc<InMemoryTaskRepo>,
    current: AtomicUsize,
    peak: AtomicUsize,
    handled: AtomicUsize,
}

#[async_trait]
impl TaskHandler for ClaimingHandler {
    async fn handle(&self, task: Task) -> Result<(), WorkerError> {
        let Some(mut claimed) = self.task_repo.claim_pending(task.id).await? else {
            return Ok(());
        };

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        claimed = claimed.complete()?;
        self.task_repo.update(&claimed).await?;
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 三个到期任务在并发上限2之下全部完成，且同时在飞的不超过2个
#[tokio::test]
async fn three_due_tasks_run_under_concurrency_two() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let tenant_id = Uuid::new_v4();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let task = due_task(tenant_id);
        ids.push(task.id);
        task_repo.seed(task);
    }

    let handler = Arc::new(ClaimingHandler {
        task_repo: task_repo.clone(),
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
        handled: AtomicUsize::new(0),
    });
    let governor = Arc::new(ConcurrencyGovernor::new(2, handler.clone()));
    let scheduler = SchedulerLoop::new(task_repo.clone(), governor, 1);

    let handle = scheduler.start();
    // One 80ms execution queues behind the first two, well inside this window.
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.abort();

    assert_eq!(handler.handled.load(Ordering::SeqCst), 3);
    assert_eq!(handler.peak.load(Ordering::SeqCst), 2);
    for id in ids {
        assert_eq!(task_repo.get(id).unwrap().status, TaskStatus::Completed);
    }
}

/// 未到期与暂停的任务不会被派发
#[tokio::test]
async fn future_and_paused_tasks_stay_untouched() {
    let task_repo = Arc::new(InMemoryTaskRepo::new());
    let tenant_id = Uuid::new_v4();

    let mut future_task = due_task(tenant_id);
    future_task.scheduled_at = (chrono::Utc::now() + chrono::Duration::hours(1)).into();
    let future_id = future_task.id;
    task_repo.seed(future_task);

    let paused = due_task(tenant_id).pause().unwrap();
    let paused_id = paused.id;
    task_repo.seed(paused);

    let handler = Arc::new(ClaimingHandler {
        task_repo: task_repo.clone(),
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
        handled: AtomicUsize::new(0),
    });
    let governor = Arc::new(ConcurrencyGovernor::new(2, handler.clone()));
    let scheduler = SchedulerLoop::new(task_repo.clone(), governor, 1);

    let handle = scheduler.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.abort();

    assert_eq!(handler.handled.load(Ordering::SeqCst), 0);
    assert_eq!(
        task_repo.get(future_id).unwrap().status,
        TaskStatus::Pending
    );
    assert_eq!(task_repo.get(paused_id).unwrap().status, TaskStatus::Paused);
}
