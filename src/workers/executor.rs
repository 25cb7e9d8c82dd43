// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use crate::domain::repositories::trigger_task_repository::TriggerTaskRepository;
use crate::handlers::registry::HandlerRegistry;
use crate::handlers::traits::{HandlerError, TaskHandler};
use crate::infrastructure::lock::coordinator::LockCoordinator;
use crate::infrastructure::metrics;
use crate::utils::errors::TriggerTaskError;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn, Instrument};

/// 单次执行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// 处理器成功，任务已标记为 END
    Succeeded,
    /// 处理器失败或 panic，失败信息已记录
    Failed,
    /// 没有对应的处理器，任务保持原样
    MissingHandler,
    /// 锁或存储错误，任务保持原样等待下轮扫描
    Skipped,
}

/// 任务执行器
///
/// 一个执行单元的完整流程：绑定关联上下文、查找处理器、获取任务锁、
/// 在事务中运行处理器并记录结果、释放任务锁。
pub struct TaskExecutor<R: TriggerTaskRepository> {
    /// 任务仓库
    repository: Arc<R>,
    /// 处理器注册表
    registry: Arc<HandlerRegistry>,
    /// 锁协调器
    locks: Arc<LockCoordinator>,
}

impl<R: TriggerTaskRepository> TaskExecutor<R> {
    pub fn new(
        repository: Arc<R>,
        registry: Arc<HandlerRegistry>,
        locks: Arc<LockCoordinator>,
    ) -> Self {
        Self {
            repository,
            registry,
            locks,
        }
    }

    /// 执行一个任务
    ///
    /// 关联上下文只在本次执行期间绑定，不会影响并发的其他执行单元
    pub async fn execute(&self, task: TriggerTask) -> ExecutionOutcome {
        let span = info_span!(
            "trigger_task",
            task_id = task.id,
            task_type = %task.task_type,
            context = %task.correlation_context,
        );
        let context = task.correlation_context.clone();

        context
            .scope(self.execute_in_context(task).instrument(span))
            .await
    }

    async fn execute_in_context(&self, task: TriggerTask) -> ExecutionOutcome {
        let Some(handler) = self.registry.get(&task.task_type) else {
            let e = TriggerTaskError::Configuration(task.task_type.clone());
            error!("Skipping trigger task {}: {}", task.id, e);
            metrics::record_missing_handler(&task.task_type);
            return ExecutionOutcome::MissingHandler;
        };

        let guard = if task.has_lock_key() {
            match self.locks.acquire(&task.lock_key).await {
                Ok(guard) => Some(guard),
                Err(e) => {
                    error!(
                        "Failed to acquire lock {} for trigger task {}: {}",
                        task.lock_key, task.id, e
                    );
                    return ExecutionOutcome::Skipped;
                }
            }
        } else {
            None
        };

        let outcome = self.run_handler(handler.as_ref(), task).await;

        if let Some(guard) = guard {
            if let Err(e) = guard.release().await {
                warn!("Failed to release task lock: {}", e);
            }
        }

        outcome
    }

    async fn run_handler(&self, handler: &dyn TaskHandler, mut task: TriggerTask) -> ExecutionOutcome {
        let txn = match self.repository.begin().await {
            Ok(txn) => txn,
            Err(e) => {
                error!("Failed to begin transaction for trigger task {}: {}", task.id, e);
                return ExecutionOutcome::Skipped;
            }
        };

        let result = AssertUnwindSafe(handler.handle(&task, &txn))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic))));

        let failure = match result {
            Ok(()) => match self.repository.mark_end(&txn, task.id, Utc::now()).await {
                Ok(()) => match txn.commit().await {
                    Ok(()) => {
                        debug!("Trigger task {} finished", task.id);
                        metrics::record_outcome(&task.task_type, true);
                        return ExecutionOutcome::Succeeded;
                    }
                    Err(e) => format!("Commit failed: {}", e),
                },
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        warn!("Failed to roll back trigger task {}: {}", task.id, rollback);
                    }
                    format!("Failed to mark task as ended: {}", e)
                }
            },
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!("Failed to roll back trigger task {}: {}", task.id, rollback);
                }
                e.to_string()
            }
        };

        warn!("Trigger task {} failed: {}", task.id, failure);
        metrics::record_outcome(&task.task_type, false);

        if let Err(e) = task.record_failure(failure, Utc::now()) {
            error!("Cannot record failure of trigger task {}: {}", task.id, e);
            return ExecutionOutcome::Failed;
        }
        // 事务已回滚，失败信息单独更新
        if let Err(e) = self.repository.record_failure(&task).await {
            error!("Failed to persist failure of trigger task {}: {}", task.id, e);
        }

        ExecutionOutcome::Failed
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
