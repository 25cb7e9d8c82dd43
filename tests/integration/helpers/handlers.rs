// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::DatabaseTransaction;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use trigger_task::domain::models::trigger_task::TriggerTask;
use trigger_task::handlers::traits::{HandlerError, TaskHandler};

/// 记录并发度的处理器
///
/// 每次执行保持 `hold` 时长，统计全局和每个 lock_key 的最大同时执行数
pub struct ConcurrencyProbe {
    task_type: &'static str,
    hold: Duration,
    state: Mutex<ProbeState>,
}

#[derive(Default)]
struct ProbeState {
    active: usize,
    max_active: usize,
    active_by_key: HashMap<String, usize>,
    max_by_key: HashMap<String, usize>,
    executed: Vec<i64>,
}

impl ConcurrencyProbe {
    pub fn new(task_type: &'static str, hold: Duration) -> Self {
        Self {
            task_type,
            hold,
            state: Mutex::new(ProbeState::default()),
        }
    }

    pub fn max_active(&self) -> usize {
        self.state.lock().unwrap().max_active
    }

    pub fn max_for_key(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_by_key
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn executed(&self) -> Vec<i64> {
        self.state.lock().unwrap().executed.clone()
    }

    fn enter(&self, task: &TriggerTask) {
        let mut state = self.state.lock().unwrap();
        state.active += 1;
        state.max_active = state.max_active.max(state.active);

        let active = {
            let entry = state.active_by_key.entry(task.lock_key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let max = state.max_by_key.entry(task.lock_key.clone()).or_insert(0);
        *max = (*max).max(active);
        state.executed.push(task.id);
    }

    fn exit(&self, task: &TriggerTask) {
        let mut state = self.state.lock().unwrap();
        state.active -= 1;
        if let Some(active) = state.active_by_key.get_mut(&task.lock_key) {
            *active -= 1;
        }
    }
}

#[async_trait]
impl TaskHandler for ConcurrencyProbe {
    fn task_type(&self) -> &str {
        self.task_type
    }

    async fn handle(
        &self,
        task: &TriggerTask,
        _txn: &DatabaseTransaction,
    ) -> Result<(), HandlerError> {
        self.enter(task);
        tokio::time::sleep(self.hold).await;
        self.exit(task);
        Ok(())
    }
}
