// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::DomainError;
use crate::domain::repositories::trigger_task_repository::StoreError;
use crate::handlers::registry::RegistryError;
use crate::infrastructure::cache::counter_store::CounterError;
use crate::infrastructure::lock::backend::LockError;
use thiserror::Error;

/// 引擎层错误类型
///
/// 后台扫描、执行和清理中出现的错误都会汇总到这里并记录日志，不会向上抛出
#[derive(Error, Debug)]
pub enum TriggerTaskError {
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    #[error("锁错误: {0}")]
    Lock(#[from] LockError),

    #[error("计数器错误: {0}")]
    Counter(#[from] CounterError),

    #[error("注册表错误: {0}")]
    Registry(#[from] RegistryError),

    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    /// 找不到任务类型对应的处理器
    #[error("配置错误: no handler registered for task type {0}")]
    Configuration(String),
}
