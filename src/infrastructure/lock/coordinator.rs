// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::lock::backend::{LockBackend, LockError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// 默认租约时长
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);
/// 阻塞获取时的重试间隔
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// 锁协调器
///
/// 把一个锁后端包装成两种角色：
/// - 领导者锁：不阻塞，获取不到说明其他实例正在执行，本轮跳过
/// - 任务锁：阻塞等待，保证同一个 lock_key 在整个集群内同时只有一个执行单元
///
/// 所有键都带命名空间前缀 `{namespace}:{name}`。
#[derive(Clone)]
pub struct LockCoordinator {
    backend: Arc<dyn LockBackend>,
    namespace: String,
    lease: Duration,
    retry_interval: Duration,
}

impl LockCoordinator {
    /// 创建新的锁协调器
    ///
    /// # 参数
    ///
    /// * `backend` - 锁后端
    /// * `namespace` - 键前缀，一般为应用名
    pub fn new(backend: Arc<dyn LockBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            lease: DEFAULT_LEASE,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 带命名空间的完整键
    pub fn key(&self, name: &str) -> String {
        format!("{}:{}", self.namespace, name)
    }

    /// 尝试获取领导者锁
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(LockGuard))` - 本实例成为领导者
    /// * `Ok(None)` - 其他实例持有该锁
    /// * `Err(LockError)` - 锁后端不可用
    pub async fn try_acquire_leader(&self, job: &str) -> Result<Option<LockGuard>, LockError> {
        let key = self.key(job);
        let token = Uuid::new_v4().to_string();

        if self.backend.try_acquire(&key, &token, self.lease).await? {
            debug!("Acquired leader lock {}", key);
            Ok(Some(self.guard(key, token)))
        } else {
            debug!("Leader lock {} is held elsewhere", key);
            Ok(None)
        }
    }

    /// 阻塞获取任务锁，没有超时
    pub async fn acquire(&self, lock_key: &str) -> Result<LockGuard, LockError> {
        let key = self.key(lock_key);
        let token = Uuid::new_v4().to_string();

        loop {
            if self.backend.try_acquire(&key, &token, self.lease).await? {
                return Ok(self.guard(key, token));
            }
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    fn guard(&self, key: String, token: String) -> LockGuard {
        let watchdog = spawn_watchdog(
            self.backend.clone(),
            key.clone(),
            token.clone(),
            self.lease,
        );

        LockGuard {
            backend: self.backend.clone(),
            key,
            token,
            watchdog: Some(watchdog),
            released: false,
        }
    }
}

/// 持有期间按租约的三分之一周期续约
fn spawn_watchdog(
    backend: Arc<dyn LockBackend>,
    key: String,
    token: String,
    lease: Duration,
) -> JoinHandle<()> {
    let period = (lease / 3).max(Duration::from_millis(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            match backend.renew(&key, &token, lease).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Lock {} was lost before release", key);
                    break;
                }
                Err(e) => warn!("Failed to renew lock {}: {}", key, e),
            }
        }
    })
}

/// 已获取的锁
///
/// 应显式调用 [`LockGuard::release`]；如果在释放前被丢弃（例如执行单元 panic），
/// 会在后台尝试释放。
pub struct LockGuard {
    backend: Arc<dyn LockBackend>,
    key: String,
    token: String,
    watchdog: Option<JoinHandle<()>>,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 释放锁
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 已释放
    /// * `Err(LockError::NotHeld)` - 租约已过期且被他人获取
    /// * `Err(LockError::Backend)` - 锁后端不可用
    pub async fn release(mut self) -> Result<(), LockError> {
        self.stop_watchdog();
        self.released = true;

        if self.backend.release(&self.key, &self.token).await? {
            debug!("Released lock {}", self.key);
            Ok(())
        } else {
            Err(LockError::NotHeld(self.key.clone()))
        }
    }

    fn stop_watchdog(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.stop_watchdog();
        if self.released {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Lock {} dropped outside a runtime, waiting for lease expiry", self.key);
            return;
        };

        let backend = self.backend.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        runtime.spawn(async move {
            if let Err(e) = backend.release(&key, &token).await {
                warn!("Failed to release dropped lock {}: {}", key, e);
            }
        });
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
