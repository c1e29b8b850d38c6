// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use postrs::domain::models::task::{Task, TaskStatus, TaskType};
use postrs::domain::models::task_batch::{BatchStatus, TaskBatch};
use postrs::domain::repositories::task_batch_repository::TaskBatchRepository;
use postrs::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// 内存任务仓库
///
/// 在进程内存中模拟任务存储的全部语义，包括原子认领。
pub struct InMemoryTaskRepo {
    tasks: Mutex<HashMap<Uuid, Task>>,
}

impl InMemoryTaskRepo {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepo {
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError> {
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn find_due(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TaskStatus::Pending && t.scheduled_at <= now)
            .cloned()
            .collect())
    }

    async fn claim_pending(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Running;
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count_unfinished_in_batch(&self, batch_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| {
                t.batch_id == Some(batch_id)
                    && matches!(t.status, TaskStatus::Pending | TaskStatus::Running)
            })
            .count() as u64)
    }

    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), RepositoryError> {
        let tasks = self.tasks.lock().unwrap();
        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|t| t.tenant_id == params.tenant_id)
            .filter(|t| params.account_id.map_or(true, |a| t.account_id == a))
            .filter(|t| params.batch_id.map_or(true, |b| t.batch_id == Some(b)))
            .filter(|t| {
                params
                    .statuses
                    .as_ref()
                    .map_or(true, |s| s.contains(&t.status))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(params.offset as usize)
            .take(params.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(&id) {
            Some(task) if task.tenant_id == tenant_id => {
                if task.status == TaskStatus::Running {
                    return Err(RepositoryError::Conflict(
                        "cannot delete a running task".to_string(),
                    ));
                }
                tasks.remove(&id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn retry_all_failed(&self, tenant_id: Uuid) -> Result<u64, RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut retried = 0;
        for task in tasks.values_mut() {
            if task.tenant_id == tenant_id && task.status == TaskStatus::Failed {
                task.status = TaskStatus::Pending;
                task.error = None;
                task.executed_at = None;
                task.scheduled_at = Utc::now().into();
                retried += 1;
            }
        }
        Ok(retried)
    }
}

/// 内存批次仓库
pub struct InMemoryBatchRepo {
    batches: Mutex<HashMap<Uuid, TaskBatch>>,
}

impl InMemoryBatchRepo {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed(&self, batch: TaskBatch) {
        self.batches.lock().unwrap().insert(batch.id, batch);
    }
}

#[async_trait]
impl TaskBatchRepository for InMemoryBatchRepo {
    async fn create(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError> {
        self.batches
            .lock()
            .unwrap()
            .insert(batch.id, batch.clone());
        Ok(batch.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskBatch>, RepositoryError> {
        Ok(self.batches.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, batch: &TaskBatch) -> Result<TaskBatch, RepositoryError> {
        self.batches
            .lock()
            .unwrap()
            .insert(batch.id, batch.clone());
        Ok(batch.clone())
    }

    async fn mark_started(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut batches = self.batches.lock().unwrap();
        if let Some(batch) = batches.get_mut(&id) {
            if batch.status == BatchStatus::Pending {
                batch.status = BatchStatus::Running;
                batch.started_at = Some(Utc::now().into());
            }
        }
        Ok(())
    }

    async fn record_outcome(
        &self,
        id: Uuid,
        success: bool,
    ) -> Result<Option<TaskBatch>, RepositoryError> {
        let mut batches = self.batches.lock().unwrap();
        match batches.get_mut(&id) {
            Some(batch) => {
                if success {
                    batch.success_count += 1;
                } else {
                    batch.failed_count += 1;
                }
                Ok(Some(batch.clone()))
            }
            None => Ok(None),
        }
    }
}

/// 构造一个已到期的待执行任务
pub fn due_task(tenant_id: Uuid) -> Task {
    Task::new(
        tenant_id,
        Uuid::new_v4(),
        TaskType::Like,
        json!({ "target_url": "https://example.com/p/abc123/" }),
        Utc::now().into(),
    )
}

/// 构造一个空批次
pub fn empty_batch(tenant_id: Uuid, total: i32) -> TaskBatch {
    TaskBatch::new(tenant_id, TaskType::Like, total)
}
