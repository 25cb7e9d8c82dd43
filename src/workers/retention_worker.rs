// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::trigger_task_repository::TriggerTaskRepository;
use crate::infrastructure::lock::coordinator::LockCoordinator;
use crate::infrastructure::metrics;
use crate::utils::errors::TriggerTaskError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 清理使用的领导者锁
pub const CLEAR_LEADER_JOB: &str = "trigger-task:timeClear";
/// 默认保留天数
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
/// 默认每日执行时刻（UTC 小时）
pub const DEFAULT_RUN_HOUR_UTC: u32 = 1;

/// 已结束任务清理工作器
///
/// 每天一次删除状态为 END 且 `updated_at` 早于保留期的任务
pub struct RetentionWorker<R>
where
    R: TriggerTaskRepository + 'static,
{
    repository: Arc<R>,
    locks: Arc<LockCoordinator>,
    retention: Duration,
    run_hour_utc: u32,
}

impl<R> RetentionWorker<R>
where
    R: TriggerTaskRepository + 'static,
{
    pub fn new(repository: Arc<R>, locks: Arc<LockCoordinator>) -> Self {
        Self {
            repository,
            locks,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            run_hour_utc: DEFAULT_RUN_HOUR_UTC,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_run_hour_utc(mut self, hour: u32) -> Self {
        self.run_hour_utc = hour.min(23);
        self
    }

    /// 执行一次清理
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(n))` - 删除了 n 行
    /// * `Ok(None)` - 其他实例持有清理锁，本次跳过
    /// * `Err(TriggerTaskError)` - 锁或存储出错
    pub async fn purge(&self, now: DateTime<Utc>) -> Result<Option<u64>, TriggerTaskError> {
        let Some(leader) = self.locks.try_acquire_leader(CLEAR_LEADER_JOB).await? else {
            return Ok(None);
        };

        let threshold = now - self.retention;
        let result = self.repository.delete_ended_before(threshold).await;

        if let Err(e) = leader.release().await {
            warn!("Failed to release leader lock {}: {}", CLEAR_LEADER_JOB, e);
        }

        let deleted = result?;
        metrics::record_retention_deleted(deleted);
        Ok(Some(deleted))
    }
}

/// 给定时刻之后下一次到达 `hour:00 UTC` 的时间
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[async_trait]
impl<R> Worker for RetentionWorker<R>
where
    R: TriggerTaskRepository + 'static,
{
    async fn run(&self) -> Result<(), TriggerTaskError> {
        info!(
            "Trigger task retention worker started, running daily at {:02}:00 UTC",
            self.run_hour_utc
        );

        loop {
            let now = Utc::now();
            let wait = (next_run_after(now, self.run_hour_utc) - now)
                .to_std()
                .unwrap_or_default();
            tokio::time::sleep(wait).await;

            match self.purge(Utc::now()).await {
                Ok(Some(count)) => info!("Deleted {} finished trigger tasks", count),
                Ok(None) => info!("Another instance is purging trigger tasks, skipping"),
                Err(e) => error!("Failed to purge finished trigger tasks: {}", e),
            }
        }
    }

    fn name(&self) -> &str {
        "trigger-task-retention"
    }
}

#[cfg(test)]
#[path = "retention_worker_test.rs"]
mod tests;
