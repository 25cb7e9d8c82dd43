// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::models::correlation::CorrelationContext;

/// 每个任务可携带的不透明字符串参数个数
pub const MAX_TASK_PARAMS: usize = 5;

/// 触发任务实体
///
/// 对应 `trigger_task` 表中的一行。`id` 由存储分配，严格递增，
/// 同时作为扫描时键集分页的游标。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTask {
    /// 存储分配的自增标识，未入库时为 0
    pub id: i64,
    /// 任务类型，处理器注册表的查找键
    pub task_type: String,
    /// 任务状态
    pub status: TaskStatus,
    /// 最早可执行时间
    pub trigger_time: DateTime<Utc>,
    /// 备注
    pub remark: String,
    /// 入队时捕获的关联上下文，执行时恢复
    pub correlation_context: CorrelationContext,
    /// 最近一次执行失败的错误信息
    pub fail_message: String,
    /// 最近一次失败时间
    pub last_fail_time: Option<DateTime<Utc>>,
    /// 失败次数，只增不减
    pub fail_count: i32,
    /// 分布式锁键，空字符串表示不需要互斥
    pub lock_key: String,
    /// 业务参数
    pub params: TaskParams,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 任务状态
///
/// 只允许 NotEnd → End 或 NotEnd → NotEnd（重试），End 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// 未结束：新增或执行异常
    #[default]
    NotEnd,
    /// 正常结束
    End,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::NotEnd => write!(f, "NOT_END"),
            TaskStatus::End => write!(f, "END"),
        }
    }
}

/// 任务的五个不透明字符串参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    pub param1: Option<String>,
    pub param2: Option<String>,
    pub param3: Option<String>,
    pub param4: Option<String>,
    pub param5: Option<String>,
}

impl TaskParams {
    /// 按顺序把值填入 param1..param5
    ///
    /// # 返回值
    ///
    /// * `Ok(TaskParams)` - 填充后的参数
    /// * `Err(DomainError::TooManyParams)` - 超过五个值
    pub fn from_values<I, S>(values: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() > MAX_TASK_PARAMS {
            return Err(DomainError::TooManyParams(values.len()));
        }

        let mut slots = values.into_iter().map(Some);
        Ok(Self {
            param1: slots.next().flatten(),
            param2: slots.next().flatten(),
            param3: slots.next().flatten(),
            param4: slots.next().flatten(),
            param5: slots.next().flatten(),
        })
    }

    /// 以数组形式返回全部参数
    pub fn as_array(&self) -> [Option<&str>; MAX_TASK_PARAMS] {
        [
            self.param1.as_deref(),
            self.param2.as_deref(),
            self.param3.as_deref(),
            self.param4.as_deref(),
            self.param5.as_deref(),
        ]
    }
}

/// 生产者提交的新任务
///
/// 未设置的字段在入库前由 [`NewTriggerTask::into_task`] 填充默认值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTriggerTask {
    pub task_type: String,
    pub params: TaskParams,
    pub lock_key: Option<String>,
    pub trigger_time: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewTriggerTask {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: TaskParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_lock_key(mut self, lock_key: impl Into<String>) -> Self {
        self.lock_key = Some(lock_key.into());
        self
    }

    pub fn with_trigger_time(mut self, trigger_time: DateTime<Utc>) -> Self {
        self.trigger_time = Some(trigger_time);
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    /// 填充默认值并转换为待入库的任务记录
    ///
    /// 状态固定为 NotEnd，失败信息清空，失败次数归零；
    /// 触发时间、创建时间和更新时间缺省为 `now`。
    pub fn into_task(self, now: DateTime<Utc>, context: CorrelationContext) -> TriggerTask {
        TriggerTask {
            id: 0,
            task_type: self.task_type,
            status: TaskStatus::NotEnd,
            trigger_time: self.trigger_time.unwrap_or(now),
            remark: self.remark.unwrap_or_default(),
            correlation_context: context,
            fail_message: String::new(),
            last_fail_time: None,
            fail_count: 0,
            lock_key: self.lock_key.unwrap_or_default(),
            params: self.params,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换，End 是终态
    #[error("Invalid state transition from {0}")]
    InvalidStateTransition(TaskStatus),

    /// 参数个数超过上限
    #[error("Too many task params: {0} (max {MAX_TASK_PARAMS})")]
    TooManyParams(usize),
}

impl TriggerTask {
    /// 是否需要分布式互斥
    pub fn has_lock_key(&self) -> bool {
        !self.lock_key.is_empty()
    }

    /// 在给定时间点是否满足扫描条件
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::NotEnd && self.trigger_time <= now
    }

    /// 标记任务执行成功
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 状态已变为 End
    /// * `Err(DomainError)` - 任务已经结束
    pub fn mark_end(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::NotEnd => {
                self.status = TaskStatus::End;
                self.updated_at = now;
                Ok(())
            }
            TaskStatus::End => Err(DomainError::InvalidStateTransition(self.status)),
        }
    }

    /// 记录一次执行失败
    ///
    /// 失败次数加一，状态保持 NotEnd，等待后续扫描重试。
    pub fn record_failure(
        &mut self,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::NotEnd => {
                self.fail_message = message.into();
                self.last_fail_time = Some(now);
                self.fail_count = self.fail_count.saturating_add(1);
                self.updated_at = now;
                Ok(())
            }
            TaskStatus::End => Err(DomainError::InvalidStateTransition(self.status)),
        }
    }
}

#[cfg(test)]
#[path = "trigger_task_test.rs"]
mod tests;
