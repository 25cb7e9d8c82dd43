// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// 入队时不随任务持久化的上下文键
pub const DENIED_KEYS: [&str; 4] = ["requestParam", "token", "MachineName", "ApplicationName"];

tokio::task_local! {
    static CURRENT: CorrelationContext;
}

/// 关联上下文
///
/// 请求ID、链路ID等日志关联信息。生产者入队时从当前异步任务中捕获，
/// 随任务记录持久化，执行单元运行期间再绑定回去。
/// 绑定只作用于单个 future，不会泄漏到并发的其他执行单元。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationContext(BTreeMap<String, String>);

impl CorrelationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 当前异步任务绑定的上下文（未绑定时为 None）
    pub fn current() -> Option<CorrelationContext> {
        CURRENT.try_with(Clone::clone).ok()
    }

    /// 捕获当前上下文并剔除 [`DENIED_KEYS`]
    pub fn capture() -> CorrelationContext {
        Self::current().map(Self::filtered).unwrap_or_default()
    }

    /// 剔除不需要持久化的键
    pub fn filtered(mut self) -> Self {
        for key in DENIED_KEYS {
            self.0.remove(key);
        }
        self
    }

    /// 在该上下文中运行 future
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, future).await
    }

    /// 序列化为列值，空上下文存为空字符串
    pub fn to_column(&self) -> Result<String, serde_json::Error> {
        if self.is_empty() {
            return Ok(String::new());
        }
        serde_json::to_string(&self.0)
    }

    /// 从列值解析
    pub fn from_column(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}

impl fmt::Display for CorrelationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for CorrelationContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
