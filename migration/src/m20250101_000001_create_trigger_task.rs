// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

/// 触发任务表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 创建 trigger_task 表及扫描、清理所需的索引
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TriggerTask::Table)
                    .if_not_exists()
                    .col({
                        let mut col = ColumnDef::new(TriggerTask::Id);
                        // SQLite only allows AUTOINCREMENT on an INTEGER PRIMARY KEY
                        if manager.get_database_backend() == DbBackend::Sqlite {
                            col.integer();
                        } else {
                            col.big_integer();
                        }
                        col.not_null().auto_increment().primary_key();
                        col
                    })
                    .col(ColumnDef::new(TriggerTask::TaskType).text().not_null())
                    .col(
                        ColumnDef::new(TriggerTask::TaskStatus)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(TriggerTask::TriggerTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TriggerTask::Remark)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(TriggerTask::CorrelationContext)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(TriggerTask::FailMessage).text().not_null().default(""))
                    .col(ColumnDef::new(TriggerTask::LastFailTime).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(TriggerTask::FailCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TriggerTask::LockKey)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(TriggerTask::Param1).text().null())
                    .col(ColumnDef::new(TriggerTask::Param2).text().null())
                    .col(ColumnDef::new(TriggerTask::Param3).text().null())
                    .col(ColumnDef::new(TriggerTask::Param4).text().null())
                    .col(ColumnDef::new(TriggerTask::Param5).text().null())
                    .col(
                        ColumnDef::new(TriggerTask::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TriggerTask::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 扫描：task_status = NOT_END and trigger_time <= now
        manager
            .create_index(
                Index::create()
                    .name("idx_trigger_task_status_trigger_time")
                    .table(TriggerTask::Table)
                    .col(TriggerTask::TaskStatus)
                    .col(TriggerTask::TriggerTime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // 清理：task_status = END and updated_at <= threshold
        manager
            .create_index(
                Index::create()
                    .name("idx_trigger_task_status_updated_at")
                    .table(TriggerTask::Table)
                    .col(TriggerTask::TaskStatus)
                    .col(TriggerTask::UpdatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TriggerTask::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TriggerTask {
    Table,
    Id,
    TaskType,
    TaskStatus,
    TriggerTime,
    Remark,
    CorrelationContext,
    FailMessage,
    LastFailTime,
    FailCount,
    LockKey,
    Param1,
    Param2,
    Param3,
    Param4,
    Param5,
    CreatedAt,
    UpdatedAt,
}
