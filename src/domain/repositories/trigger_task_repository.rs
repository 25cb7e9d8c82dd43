// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, DbErr};
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 关联上下文序列化失败
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 扫描分页查询参数
///
/// 对应 `id > cursor and task_status = NOT_END and trigger_time <= now
/// [and fail_count <= fail_count_limit] order by id asc limit page_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 上一页的最大 id（不包含），首页为 0
    pub cursor: i64,
    /// 触发时间上限
    pub now: DateTime<Utc>,
    /// 失败次数上限，None 表示不过滤
    pub fail_count_limit: Option<i32>,
    /// 每页最多返回的行数
    pub page_size: u64,
}

/// 触发任务仓库特质
///
/// 定义触发任务的数据访问接口
#[async_trait]
pub trait TriggerTaskRepository: Send + Sync {
    /// 插入单条任务，返回存储分配的 id
    async fn insert(&self, task: &TriggerTask) -> Result<i64, StoreError>;

    /// 用一条批量插入语句写入全部任务，返回写入行数
    async fn insert_many(&self, tasks: &[TriggerTask]) -> Result<u64, StoreError>;

    /// 根据ID查找任务
    async fn find_by_id(&self, id: i64) -> Result<Option<TriggerTask>, StoreError>;

    /// 按 id 升序获取一页待执行任务
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<TriggerTask>, StoreError>;

    /// 开启事务，处理器在此事务中执行
    async fn begin(&self) -> Result<DatabaseTransaction, StoreError>;

    /// 在事务内把任务标记为 END
    async fn mark_end(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// 在事务之外写入失败信息（状态、错误信息、失败时间、更新时间）
    ///
    /// 失败次数以库中当前值为基础加一，不使用 `task.fail_count`
    async fn record_failure(&self, task: &TriggerTask) -> Result<(), StoreError>;

    /// 删除 `updated_at <= threshold` 的已结束任务，返回删除行数
    async fn delete_ended_before(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError>;
}
