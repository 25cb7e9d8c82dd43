// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::TriggerTaskError;
use async_trait::async_trait;

/// Worker trait定义
///
/// 定时扫描和每日清理等后台循环都实现此trait，由 [`WorkerManager`] 统一启动和停止
///
/// [`WorkerManager`]: crate::workers::manager::WorkerManager
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行工作器，正常情况下不会返回
    async fn run(&self) -> Result<(), TriggerTaskError>;

    /// 获取工作器名称
    fn name(&self) -> &str;
}
