// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，提供对具体技术的抽象和封装。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis客户端和退避计数器存储
/// - 数据库（database）：连接池、迁移和实体映射
/// - 锁（lock）：分布式锁后端和锁协调器
/// - 指标（metrics）：Prometheus导出和任务计数
/// - 仓库实现（repositories）：领域仓库接口的具体实现
pub mod cache;
pub mod database;
pub mod lock;
pub mod metrics;
pub mod repositories;
