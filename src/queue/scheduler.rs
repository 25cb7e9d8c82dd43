// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use crate::domain::repositories::trigger_task_repository::{PageQuery, TriggerTaskRepository};
use crate::infrastructure::lock::coordinator::LockCoordinator;
use crate::infrastructure::metrics;
use crate::queue::backoff::{fail_count_filter, BackoffPolicy};
use crate::utils::errors::TriggerTaskError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 扫描使用的领导者锁
pub const EXEC_LEADER_JOB: &str = "trigger-task:timeExec";
/// 默认每页行数
pub const DEFAULT_PAGE_SIZE: u64 = 200;
/// 默认扫描间隔
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(600);

/// 任务投递目标
///
/// 投递后立即返回，不等待执行结果
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, task: TriggerTask);
}

/// 一轮扫描的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 其他实例持有领导者锁，本轮跳过
    NotLeader,
    /// 本实例完成扫描
    Completed(CycleReport),
}

/// 扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 本轮使用的退避上限
    pub fail_count_limit: i32,
    /// 非空页数
    pub pages: usize,
    /// 投递的任务数
    pub dispatched: usize,
    /// 下一轮的退避上限
    pub next_fail_count_limit: i32,
}

/// 任务调度器
///
/// 定时或按需扫描任务表，把到期任务投递给执行池。
/// 扫描主体只在获得领导者锁的实例上运行。
pub struct TaskScheduler<R: TriggerTaskRepository + 'static> {
    /// 任务仓库
    repository: Arc<R>,
    /// 投递目标
    dispatcher: Arc<dyn TaskDispatcher>,
    /// 锁协调器
    locks: Arc<LockCoordinator>,
    /// 退避策略
    backoff: BackoffPolicy,
    /// 每页行数
    page_size: u64,
    /// 定时扫描间隔
    scan_interval: Duration,
}

impl<R: TriggerTaskRepository + 'static> TaskScheduler<R> {
    /// 创建新的任务调度器实例
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    /// * `dispatcher` - 投递目标，一般是执行池
    /// * `locks` - 锁协调器
    /// * `backoff` - 退避策略
    pub fn new(
        repository: Arc<R>,
        dispatcher: Arc<dyn TaskDispatcher>,
        locks: Arc<LockCoordinator>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            locks,
            backoff,
            page_size: DEFAULT_PAGE_SIZE,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_scan_interval(mut self, scan_interval: Duration) -> Self {
        self.scan_interval = scan_interval;
        self
    }

    /// 运行一轮扫描
    ///
    /// # 返回值
    ///
    /// * `Ok(CycleOutcome::NotLeader)` - 其他实例正在扫描
    /// * `Ok(CycleOutcome::Completed)` - 扫描完成
    /// * `Err(TriggerTaskError)` - 锁、计数器或存储出错，本轮放弃
    pub async fn run_cycle(&self) -> Result<CycleOutcome, TriggerTaskError> {
        let Some(leader) = self.locks.try_acquire_leader(EXEC_LEADER_JOB).await? else {
            return Ok(CycleOutcome::NotLeader);
        };

        let result = self.scan().await;

        if let Err(e) = leader.release().await {
            warn!("Failed to release leader lock {}: {}", EXEC_LEADER_JOB, e);
        }

        result.map(CycleOutcome::Completed)
    }

    async fn scan(&self) -> Result<CycleReport, TriggerTaskError> {
        let limit = self.backoff.current_limit().await?;
        let mut report = CycleReport {
            fail_count_limit: limit,
            ..Default::default()
        };
        let mut query = PageQuery {
            cursor: 0,
            now: Utc::now(),
            fail_count_limit: fail_count_filter(limit),
            page_size: self.page_size,
        };

        loop {
            let page = self.repository.fetch_page(&query).await?;
            let Some(max_id) = page.iter().map(|task| task.id).max() else {
                break;
            };

            let last_page = (page.len() as u64) < self.page_size;
            report.pages += 1;
            query.cursor = max_id;

            for task in page {
                metrics::record_dispatched();
                self.dispatcher.dispatch(task);
                report.dispatched += 1;
            }

            if last_page {
                break;
            }
        }

        report.next_fail_count_limit = self.backoff.advance(limit).await?;
        Ok(report)
    }

    /// 运行一轮扫描并记录结果，错误不会向外传播
    pub async fn tick(&self) {
        match self.run_cycle().await {
            Ok(CycleOutcome::NotLeader) => {
                debug!("Another instance is scanning trigger tasks, skipping");
            }
            Ok(CycleOutcome::Completed(report)) => {
                if report.dispatched > 0 {
                    info!(
                        "Dispatched {} trigger tasks from {} pages (fail count limit {})",
                        report.dispatched, report.pages, report.fail_count_limit
                    );
                }
            }
            Err(e) => error!("Trigger task scan failed: {}", e),
        }
    }

    /// 延迟若干秒后运行一轮扫描
    ///
    /// 与定时扫描一样经过领导者锁，适合生产者写入后希望尽快执行的场景
    pub fn exec_after(self: &Arc<Self>, delay_seconds: u64) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
            scheduler.tick().await;
        })
    }
}

#[async_trait]
impl<R: TriggerTaskRepository + 'static> Worker for TaskScheduler<R> {
    async fn run(&self) -> Result<(), TriggerTaskError> {
        info!(
            "Trigger task scheduler started, scanning every {:?}",
            self.scan_interval
        );

        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    fn name(&self) -> &str {
        "trigger-task-scheduler"
    }
}
