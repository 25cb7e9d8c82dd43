// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::counter_store::{CounterError, CounterStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 计数器循环周期，取值 0..=3
pub const CYCLE_LENGTH: i32 = 4;
/// 达到该值时不再按失败次数过滤
pub const UNFILTERED_LIMIT: i32 = CYCLE_LENGTH - 1;
/// 计数器键（不含命名空间）
pub const FAIL_COUNT_LIMIT_KEY: &str = "trigger-task:failCountLimit";
/// 计数器默认缓存时间
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// 重试退避策略
///
/// 集群共享的整数 L 在 0..3 之间循环，每轮扫描结束后前进一步：
/// 失败 0 次的任务每轮都会尝试；失败 f 次的任务在 L < f 的轮次跳过；
/// L = 3 的轮次所有任务都会尝试。
#[derive(Clone)]
pub struct BackoffPolicy {
    counter: Arc<dyn CounterStore>,
    key: String,
    ttl: Duration,
}

impl BackoffPolicy {
    /// 创建退避策略
    ///
    /// # 参数
    ///
    /// * `counter` - 共享计数器存储
    /// * `namespace` - 键前缀
    pub fn new(counter: Arc<dyn CounterStore>, namespace: &str) -> Self {
        Self {
            counter,
            key: format!("{}:{}", namespace, FAIL_COUNT_LIMIT_KEY),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 读取当前上限，不存在或超出范围时为 0
    pub async fn current_limit(&self) -> Result<i32, CounterError> {
        let value = self.counter.get(&self.key).await?.unwrap_or(0);
        if !(0..CYCLE_LENGTH as i64).contains(&value) {
            warn!("Ignoring out of range fail count limit {} at {}", value, self.key);
            return Ok(0);
        }
        Ok(value as i32)
    }

    /// 保存下一轮的上限并返回
    pub async fn advance(&self, limit: i32) -> Result<i32, CounterError> {
        let next = next_limit(limit);
        self.counter.set(&self.key, next as i64, self.ttl).await?;
        Ok(next)
    }
}

/// 本轮查询使用的失败次数过滤条件，None 表示不过滤
pub fn fail_count_filter(limit: i32) -> Option<i32> {
    if limit >= UNFILTERED_LIMIT {
        None
    } else {
        Some(limit)
    }
}

pub fn next_limit(limit: i32) -> i32 {
    (limit + 1).rem_euclid(CYCLE_LENGTH)
}

/// 在给定上限下，失败 `fail_count` 次的任务是否会被尝试
pub fn is_attempted(fail_count: i32, limit: i32) -> bool {
    fail_count_filter(limit).map_or(true, |max| fail_count <= max)
}
