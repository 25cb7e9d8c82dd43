// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use async_trait::async_trait;
use sea_orm::{DatabaseTransaction, DbErr};
use thiserror::Error;

/// 处理器错误类型
///
/// 任何变体都会被记为一次失败，等待后续扫描按退避策略重试
#[derive(Error, Debug)]
pub enum HandlerError {
    /// 业务失败
    #[error("{0}")]
    Failed(String),
    /// 事务内的数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 处理器 panic
    #[error("Handler panicked: {0}")]
    Panicked(String),
    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// 任务处理器特质
///
/// 每个任务类型对应一个处理器。`handle` 在数据库事务中运行，
/// 返回 `Ok` 时任务被标记为 END 并提交；返回错误或 panic 时事务回滚。
/// 投递语义是至少一次，实现必须是幂等的。
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// 注册表中的查找键，大小写敏感
    fn task_type(&self) -> &str;

    /// 执行任务
    async fn handle(&self, task: &TriggerTask, txn: &DatabaseTransaction)
        -> Result<(), HandlerError>;
}
