// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 触发任务实体、关联上下文和仓库接口
pub mod domain;

/// 处理器模块
///
/// 任务处理器契约和注册表
pub mod handlers;

/// 基础设施模块
///
/// 数据库、Redis、分布式锁和指标
pub mod infrastructure;

/// 队列模块
///
/// 生产者入口、重试退避和扫描调度
pub mod queue;

/// 工具模块
///
/// 错误汇总和日志初始化
pub mod utils;

/// 工作器模块
///
/// 任务执行、执行池和后台工作器管理
pub mod workers;
