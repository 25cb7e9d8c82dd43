// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::trigger_task_repository::TriggerTaskRepository;
use crate::workers::pool::WorkerPool;
use crate::workers::worker::Worker;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 启动定时扫描、每日清理等后台循环；关闭时先停止循环，
/// 再等待执行池中已投递的任务全部结束。
pub struct WorkerManager<R>
where
    R: TriggerTaskRepository + 'static,
{
    pool: Arc<WorkerPool<R>>,
    workers: Vec<Arc<dyn Worker>>,
    handles: Vec<JoinHandle<()>>,
}

impl<R> WorkerManager<R>
where
    R: TriggerTaskRepository + 'static,
{
    pub fn new(pool: Arc<WorkerPool<R>>) -> Self {
        Self {
            pool,
            workers: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// 添加后台工作器
    pub fn add_worker(&mut self, worker: Arc<dyn Worker>) {
        self.workers.push(worker);
    }

    /// 启动所有工作器
    pub fn start_workers(&mut self) {
        for worker in &self.workers {
            let worker = worker.clone();
            let handle = tokio::spawn(async move {
                info!("Starting worker {}", worker.name());
                if let Err(e) = worker.run().await {
                    error!("Worker {} stopped: {}", worker.name(), e);
                }
            });
            self.handles.push(handle);
        }
    }

    /// 停止工作器并等待执行池排空
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }

        let pending = self.pool.in_flight();
        if pending > 0 {
            info!("Waiting for {} in-flight trigger tasks", pending);
        }
        self.pool.wait_idle().await;

        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        self.shutdown().await;
    }
}
