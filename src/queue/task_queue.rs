// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::correlation::CorrelationContext;
use crate::domain::models::trigger_task::{NewTriggerTask, TaskParams, TriggerTask};
use crate::domain::repositories::trigger_task_repository::{StoreError, TriggerTaskRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// 每条批量插入语句的默认最大行数
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// 触发任务队列
///
/// 生产者入口：补全默认值、捕获当前关联上下文，然后写入任务表。
/// 任务在之后的扫描中被执行。
pub struct TriggerTaskQueue<R: TriggerTaskRepository> {
    /// 任务仓库
    repository: Arc<R>,
    /// 批量插入分块大小
    batch_size: usize,
}

impl<R: TriggerTaskRepository> TriggerTaskQueue<R> {
    /// 创建新的任务队列实例
    ///
    /// # 参数
    ///
    /// * `repository` - 任务仓库
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// 按配置创建，批量插入分块大小取 `scheduler.batch_size`
    pub fn from_settings(repository: Arc<R>, settings: &SchedulerSettings) -> Self {
        Self::new(repository).with_batch_size(settings.batch_size)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 入队单个任务
    ///
    /// # 参数
    ///
    /// * `task_type` - 任务类型
    /// * `params` - 业务参数
    /// * `lock_key` - 互斥键，None 表示不需要互斥
    /// * `trigger_time` - 最早执行时间，None 表示立即
    /// * `remark` - 备注
    ///
    /// # 返回值
    ///
    /// * `Ok(i64)` - 存储分配的任务ID
    /// * `Err(StoreError)` - 写入失败
    pub async fn enqueue(
        &self,
        task_type: impl Into<String>,
        params: TaskParams,
        lock_key: Option<String>,
        trigger_time: Option<DateTime<Utc>>,
        remark: Option<String>,
    ) -> Result<i64, StoreError> {
        let task = NewTriggerTask {
            task_type: task_type.into(),
            params,
            lock_key,
            trigger_time,
            remark,
            ..Default::default()
        };
        self.save(task).await
    }

    /// 保存单个任务
    ///
    /// 失败时不写入任何数据
    pub async fn save(&self, task: NewTriggerTask) -> Result<i64, StoreError> {
        let record = task.into_task(Utc::now(), CorrelationContext::capture());
        let id = self.repository.insert(&record).await?;
        debug!("Saved trigger task {} of type {}", id, record.task_type);
        Ok(id)
    }

    /// 批量保存任务
    ///
    /// 按输入顺序每 `batch_size` 条生成一条插入语句。
    /// 某个分块失败时返回错误，此前已写入的分块保持提交状态。
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 写入的总行数
    /// * `Err(StoreError)` - 某个分块写入失败
    pub async fn save_batch(&self, tasks: Vec<NewTriggerTask>) -> Result<u64, StoreError> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let context = CorrelationContext::capture();
        let records: Vec<TriggerTask> = tasks
            .into_iter()
            .map(|task| task.into_task(now, context.clone()))
            .collect();

        let mut inserted = 0;
        for chunk in records.chunks(self.batch_size) {
            inserted += self.repository.insert_many(chunk).await?;
        }

        debug!(
            "Saved {} trigger tasks in chunks of {}",
            inserted, self.batch_size
        );
        Ok(inserted)
    }
}
