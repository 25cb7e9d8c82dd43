// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 锁错误类型
#[derive(Error, Debug)]
pub enum LockError {
    /// 锁后端不可用
    #[error("Lock backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// 释放时持有者令牌已不匹配（租约过期后被他人获取）
    #[error("Lock {0} is no longer held by this owner")]
    NotHeld(String),
}

/// 互斥原语后端
///
/// 每个键同一时刻最多一个持有者，持有者由令牌标识；
/// 续约和释放只在令牌匹配时生效。
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// 尝试获取，不阻塞
    async fn try_acquire(&self, key: &str, token: &str, lease: Duration)
        -> Result<bool, LockError>;

    /// 延长租约，令牌不匹配时返回 false
    async fn renew(&self, key: &str, token: &str, lease: Duration) -> Result<bool, LockError>;

    /// 释放锁，令牌不匹配时返回 false
    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError>;
}
