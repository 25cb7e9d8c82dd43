// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use crate::domain::repositories::trigger_task_repository::TriggerTaskRepository;
use crate::queue::scheduler::TaskDispatcher;
use crate::workers::executor::TaskExecutor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::warn;

/// 默认并发执行单元数
pub const DEFAULT_POOL_SIZE: usize = 10;

/// 固定大小的执行池
///
/// 投递立即返回；同时运行的执行单元不超过 `size`，其余排队等待许可。
pub struct WorkerPool<R: TriggerTaskRepository + 'static> {
    executor: Arc<TaskExecutor<R>>,
    permits: Arc<Semaphore>,
    size: usize,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl<R: TriggerTaskRepository + 'static> WorkerPool<R> {
    /// 创建执行池
    ///
    /// # 参数
    ///
    /// * `executor` - 任务执行器
    /// * `size` - 最大并发数，至少为 1
    pub fn new(executor: Arc<TaskExecutor<R>>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            executor,
            permits: Arc::new(Semaphore::new(size)),
            size,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 已投递但尚未结束的执行单元数（含排队中的）
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 等待所有已投递的执行单元结束
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl<R: TriggerTaskRepository + 'static> TaskDispatcher for WorkerPool<R> {
    fn dispatch(&self, task: TriggerTask) {
        let executor = self.executor.clone();
        let permits = self.permits.clone();
        let in_flight = self.in_flight.clone();
        let idle = self.idle.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => {
                    executor.execute(task).await;
                }
                Err(_) => warn!("Worker pool closed, trigger task {} not executed", task.id),
            }

            if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_waiters();
            }
        });
    }
}
