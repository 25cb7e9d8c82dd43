// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::lock::backend::{LockBackend, LockError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// 进程内锁后端
///
/// 语义与Redis后端一致（令牌、租约过期），用于单节点部署和测试。
/// 同一个实例在多个协调器之间共享即可模拟多个节点。
#[derive(Debug, Default)]
pub struct LocalLockBackend {
    holders: DashMap<String, Holder>,
}

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

impl LocalLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否有人持有该键
    pub fn is_held(&self, key: &str) -> bool {
        self.holders
            .get(key)
            .map(|holder| holder.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LockBackend for LocalLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let now = Instant::now();
        let holder = Holder {
            token: token.to_string(),
            expires_at: now + lease,
        };

        match self.holders.entry(key.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(holder);
                Ok(true)
            }
            Entry::Occupied(mut entry) if entry.get().expires_at <= now => {
                entry.insert(holder);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn renew(&self, key: &str, token: &str, lease: Duration) -> Result<bool, LockError> {
        let now = Instant::now();
        match self.holders.get_mut(key) {
            Some(mut holder) if holder.token == token && holder.expires_at > now => {
                holder.expires_at = now + lease;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        Ok(self
            .holders
            .remove_if(key, |_, holder| holder.token == token)
            .is_some())
    }
}
