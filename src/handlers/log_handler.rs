// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::trigger_task::TriggerTask;
use crate::handlers::traits::{HandlerError, TaskHandler};
use async_trait::async_trait;
use sea_orm::DatabaseTransaction;
use tracing::info;

/// 内置处理器：只记录任务参数
///
/// 用于联调和冒烟检查，任务类型为 `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl LogHandler {
    pub const TASK_TYPE: &'static str = "log";
}

#[async_trait]
impl TaskHandler for LogHandler {
    fn task_type(&self) -> &str {
        Self::TASK_TYPE
    }

    async fn handle(
        &self,
        task: &TriggerTask,
        _txn: &DatabaseTransaction,
    ) -> Result<(), HandlerError> {
        let [p1, p2, p3, p4, p5] = task.params.as_array();
        info!(
            task_id = task.id,
            remark = %task.remark,
            "params: {:?} {:?} {:?} {:?} {:?}",
            p1, p2, p3, p4, p5
        );
        Ok(())
    }
}
