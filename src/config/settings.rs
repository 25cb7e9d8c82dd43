// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含应用、数据库、Redis、调度、日志和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 应用配置
    pub application: ApplicationSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 调度配置
    pub scheduler: SchedulerSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 应用配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    /// 应用名，同时作为锁和计数器键的命名空间
    pub name: String,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
    /// 是否输出SQL日志
    #[serde(default)]
    pub sqlx_logging: bool,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 调度配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 定时扫描间隔（秒）
    pub scan_interval_secs: u64,
    /// 每页扫描行数
    pub page_size: u64,
    /// 执行单元并发数
    pub worker_pool_size: usize,
    /// 批量插入每条语句的最大行数
    pub batch_size: usize,
    /// 退避上限的缓存时间（秒）
    pub fail_count_limit_ttl_secs: u64,
    /// 已结束任务的保留天数
    pub retention_days: i64,
    /// 每日清理的执行时刻（UTC 小时）
    pub retention_hour_utc: u32,
    /// 锁租约（秒）
    pub lock_lease_secs: u64,
    /// 阻塞获取任务锁的重试间隔（毫秒）
    pub lock_retry_interval_ms: u64,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 是否输出JSON格式
    pub json: bool,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus导出地址
    pub listen_addr: String,
}

impl SchedulerSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn fail_count_limit_ttl(&self) -> Duration {
        Duration::from_secs(self.fail_count_limit_ttl_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_secs)
    }

    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: 600,
            page_size: 200,
            worker_pool_size: 10,
            batch_size: 500,
            fail_count_limit_ttl_secs: 3600,
            retention_days: 30,
            retention_hour_utc: 1,
            lock_lease_secs: 30,
            lock_retry_interval_ms: 100,
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `TRIGGER_TASK__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("TRIGGER_TASK").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 内置默认值
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let scheduler = SchedulerSettings::default();
        Config::builder()
            .set_default("application.name", "trigger-task")?
            .set_default("database.url", "sqlite://trigger_task.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("scheduler.scan_interval_secs", scheduler.scan_interval_secs)?
            .set_default("scheduler.page_size", scheduler.page_size)?
            .set_default("scheduler.worker_pool_size", scheduler.worker_pool_size as u64)?
            .set_default("scheduler.batch_size", scheduler.batch_size as u64)?
            .set_default(
                "scheduler.fail_count_limit_ttl_secs",
                scheduler.fail_count_limit_ttl_secs,
            )?
            .set_default("scheduler.retention_days", scheduler.retention_days)?
            .set_default("scheduler.retention_hour_utc", scheduler.retention_hour_utc)?
            .set_default("scheduler.lock_lease_secs", scheduler.lock_lease_secs)?
            .set_default(
                "scheduler.lock_retry_interval_ms",
                scheduler.lock_retry_interval_ms,
            )?
            .set_default("logging.json", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
