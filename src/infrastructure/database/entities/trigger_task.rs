// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

/// `trigger_task` 表的静态模式描述
///
/// 列名为字段名的 snake_case 形式，插入语句的列集合完全由此派生
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trigger_task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub task_type: String,
    pub task_status: TaskStatusColumn,
    pub trigger_time: ChronoDateTimeUtc,
    #[sea_orm(column_type = "Text")]
    pub remark: String,
    #[sea_orm(column_type = "Text")]
    pub correlation_context: String,
    #[sea_orm(column_type = "Text")]
    pub fail_message: String,
    pub last_fail_time: Option<ChronoDateTimeUtc>,
    pub fail_count: i32,
    #[sea_orm(column_type = "Text")]
    pub lock_key: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub param1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub param2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub param3: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub param4: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub param5: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

/// 任务状态列，数据库中以整数存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum TaskStatusColumn {
    #[sea_orm(num_value = 1)]
    NotEnd,
    #[sea_orm(num_value = 2)]
    End,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
