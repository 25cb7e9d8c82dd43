// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use std::time::Duration;

/// Redis客户端
///
/// 分布式锁和退避计数器共用的异步连接入口
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(RedisError)` - URL 无法解析
    pub fn new(redis_url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// 获取多路复用连接，供脚本调用使用
    pub async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    /// 读取整数值，键不存在时返回 None
    pub async fn get_i64(&self, key: &str) -> RedisResult<Option<i64>> {
        let mut con = self.connection().await?;
        con.get(key).await
    }

    /// 设置键值对并指定过期时间
    ///
    /// # 参数
    ///
    /// * `key` - 键
    /// * `value` - 值
    /// * `ttl` - 过期时间，按秒取整
    pub async fn set_ex(&self, key: &str, value: i64, ttl: Duration) -> RedisResult<()> {
        let mut con = self.connection().await?;
        con.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
    }

    /// `SET key value NX PX lease`
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 键原本不存在，已写入
    /// * `Ok(false)` - 键已被占用
    pub async fn set_nx_px(&self, key: &str, value: &str, lease: Duration) -> RedisResult<bool> {
        let mut con = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis() as u64)
            .query_async(&mut con)
            .await?;
        Ok(reply.is_some())
    }
}
