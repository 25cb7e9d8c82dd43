// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::redis_client::RedisClient;
use crate::infrastructure::lock::backend::{LockBackend, LockError};
use async_trait::async_trait;
use std::time::Duration;

const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

const RENEW_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("PEXPIRE", KEYS[1], ARGV[2])
    else
        return 0
    end
"#;

/// 基于Redis的分布式锁
///
/// 获取使用 `SET NX PX`，续约和释放使用比较令牌的 Lua 脚本
#[derive(Clone)]
pub struct RedisLockBackend {
    redis: RedisClient,
}

impl RedisLockBackend {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        Ok(self.redis.set_nx_px(key, token, lease).await?)
    }

    async fn renew(&self, key: &str, token: &str, lease: Duration) -> Result<bool, LockError> {
        let mut conn = self.redis.connection().await?;
        let renewed: i64 = redis::Script::new(RENEW_SCRIPT)
            .key(key)
            .arg(token)
            .arg(lease.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(renewed == 1)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let mut conn = self.redis.connection().await?;
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }
}
