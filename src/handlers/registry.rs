// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::handlers::traits::TaskHandler;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// 注册表错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// 同一任务类型重复注册
    #[error("Handler already registered for task type {0}")]
    Duplicate(String),
    /// 空的任务类型
    #[error("Task type must not be empty")]
    EmptyTaskType,
}

/// 处理器注册表
///
/// 启动时一次性注册，之后以 `Arc<HandlerRegistry>` 只读共享给所有执行单元。
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 注册成功
    /// * `Err(RegistryError::Duplicate)` - 该任务类型已有处理器
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) -> Result<(), RegistryError> {
        let task_type = handler.task_type().to_string();
        if task_type.is_empty() {
            return Err(RegistryError::EmptyTaskType);
        }
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::Duplicate(task_type));
        }

        info!("Registered handler for task type {}", task_type);
        self.handlers.insert(task_type, handler);
        Ok(())
    }

    /// 链式注册，便于启动时构建
    pub fn with(mut self, handler: Arc<dyn TaskHandler>) -> Result<Self, RegistryError> {
        self.register(handler)?;
        Ok(self)
    }

    /// 精确匹配任务类型
    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    /// 已注册的任务类型，按字典序
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
