// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::correlation::CorrelationContext;
use crate::domain::models::trigger_task::{TaskParams, TaskStatus, TriggerTask};
use crate::domain::repositories::trigger_task_repository::{
    PageQuery, StoreError, TriggerTaskRepository,
};
use crate::infrastructure::database::entities::trigger_task::{
    self as task_entity, TaskStatusColumn,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect,
    QueryTrait, Set, Statement, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 触发任务仓库实现
///
/// 基于SeaORM实现的触发任务数据访问层
#[derive(Clone)]
pub struct TriggerTaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TriggerTaskRepositoryImpl {
    /// 创建新的触发任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 构造批量插入语句
    ///
    /// 列集合来自实体的静态模式描述，`id` 列始终省略由数据库分配，
    /// 所有值都以绑定参数传递。空输入返回 `Ok(None)`。
    pub fn build_insert_statement(
        backend: DbBackend,
        tasks: &[TriggerTask],
    ) -> Result<Option<Statement>, StoreError> {
        if tasks.is_empty() {
            return Ok(None);
        }

        let models = tasks
            .iter()
            .map(to_active_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(task_entity::Entity::insert_many(models).build(backend)))
    }
}

impl From<TaskStatus> for TaskStatusColumn {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::NotEnd => TaskStatusColumn::NotEnd,
            TaskStatus::End => TaskStatusColumn::End,
        }
    }
}

impl From<TaskStatusColumn> for TaskStatus {
    fn from(status: TaskStatusColumn) -> Self {
        match status {
            TaskStatusColumn::NotEnd => TaskStatus::NotEnd,
            TaskStatusColumn::End => TaskStatus::End,
        }
    }
}

impl From<task_entity::Model> for TriggerTask {
    fn from(model: task_entity::Model) -> Self {
        let correlation_context = CorrelationContext::from_column(&model.correlation_context)
            .unwrap_or_else(|e| {
                warn!(
                    "Ignoring unreadable correlation context of trigger task {}: {}",
                    model.id, e
                );
                CorrelationContext::default()
            });

        Self {
            id: model.id,
            task_type: model.task_type,
            status: model.task_status.into(),
            trigger_time: model.trigger_time,
            remark: model.remark,
            correlation_context,
            fail_message: model.fail_message,
            last_fail_time: model.last_fail_time,
            fail_count: model.fail_count,
            lock_key: model.lock_key,
            params: TaskParams {
                param1: model.param1,
                param2: model.param2,
                param3: model.param3,
                param4: model.param4,
                param5: model.param5,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// 任务记录转换为插入用的 ActiveModel，`id` 保持 NotSet
fn to_active_model(task: &TriggerTask) -> Result<task_entity::ActiveModel, StoreError> {
    Ok(task_entity::ActiveModel {
        id: NotSet,
        task_type: Set(task.task_type.clone()),
        task_status: Set(task.status.into()),
        trigger_time: Set(task.trigger_time),
        remark: Set(task.remark.clone()),
        correlation_context: Set(task.correlation_context.to_column()?),
        fail_message: Set(task.fail_message.clone()),
        last_fail_time: Set(task.last_fail_time),
        fail_count: Set(task.fail_count),
        lock_key: Set(task.lock_key.clone()),
        param1: Set(task.params.param1.clone()),
        param2: Set(task.params.param2.clone()),
        param3: Set(task.params.param3.clone()),
        param4: Set(task.params.param4.clone()),
        param5: Set(task.params.param5.clone()),
        created_at: Set(task.created_at),
        updated_at: Set(task.updated_at),
    })
}

#[async_trait]
impl TriggerTaskRepository for TriggerTaskRepositoryImpl {
    async fn insert(&self, task: &TriggerTask) -> Result<i64, StoreError> {
        let model = to_active_model(task)?;
        let result = task_entity::Entity::insert(model)
            .exec(self.db.as_ref())
            .await?;
        Ok(result.last_insert_id)
    }

    async fn insert_many(&self, tasks: &[TriggerTask]) -> Result<u64, StoreError> {
        let backend = self.db.get_database_backend();
        let Some(statement) = Self::build_insert_statement(backend, tasks)? else {
            return Ok(0);
        };

        debug!("Bulk inserting {} trigger tasks", tasks.len());
        let result = self.db.execute(statement).await?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TriggerTask>, StoreError> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<TriggerTask>, StoreError> {
        let mut select = task_entity::Entity::find()
            .filter(task_entity::Column::Id.gt(query.cursor))
            .filter(task_entity::Column::TaskStatus.eq(TaskStatusColumn::NotEnd.to_value()))
            .filter(task_entity::Column::TriggerTime.lte(query.now));

        if let Some(limit) = query.fail_count_limit {
            select = select.filter(task_entity::Column::FailCount.lte(limit));
        }

        let models = select
            .order_by_asc(task_entity::Column::Id)
            .limit(query.page_size)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(TriggerTask::from).collect())
    }

    async fn begin(&self) -> Result<DatabaseTransaction, StoreError> {
        Ok(self.db.begin().await?)
    }

    async fn mark_end(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::TaskStatus,
                Expr::value(TaskStatusColumn::End.to_value()),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(id))
            .filter(task_entity::Column::TaskStatus.eq(TaskStatusColumn::NotEnd.to_value()))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn record_failure(&self, task: &TriggerTask) -> Result<(), StoreError> {
        // 已结束的行不会被改回 NOT_END；失败次数在库内累加，
        // 同一任务的旧快照晚到时也不会把计数改小
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::TaskStatus,
                Expr::value(TaskStatusColumn::NotEnd.to_value()),
            )
            .col_expr(
                task_entity::Column::FailMessage,
                Expr::value(task.fail_message.clone()),
            )
            .col_expr(
                task_entity::Column::LastFailTime,
                Expr::value(task.last_fail_time),
            )
            .col_expr(
                task_entity::Column::FailCount,
                Expr::col(task_entity::Column::FailCount).add(1),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(task.updated_at))
            .filter(task_entity::Column::Id.eq(task.id))
            .filter(task_entity::Column::TaskStatus.eq(TaskStatusColumn::NotEnd.to_value()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_ended_before(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = task_entity::Entity::delete_many()
            .filter(task_entity::Column::TaskStatus.eq(TaskStatusColumn::End.to_value()))
            .filter(task_entity::Column::UpdatedAt.lte(threshold))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[path = "trigger_task_repo_impl_test.rs"]
mod tests;
