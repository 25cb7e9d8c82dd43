// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 计数器存储错误
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// 带过期时间的整数键值存储
///
/// 退避上限在整个集群内共享，由这里读写。
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 读取当前值，不存在或已过期时返回 None
    async fn get(&self, key: &str) -> Result<Option<i64>, CounterError>;

    /// 写入值并重置过期时间
    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CounterError>;
}

/// 基于Redis的计数器存储
#[derive(Clone)]
pub struct RedisCounterStore {
    redis: RedisClient,
}

impl RedisCounterStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, CounterError> {
        Ok(self.redis.get_i64(key).await?)
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CounterError> {
        Ok(self.redis.set_ex(key, value, ttl).await?)
    }
}

/// 进程内计数器存储，单节点部署和测试使用
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    entries: DashMap<String, (i64, Instant)>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, CounterError> {
        let now = Instant::now();
        // 过期条目在读取时清除
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(self.entries.get(key).map(|entry| entry.0))
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CounterError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}
