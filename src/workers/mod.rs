// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 任务执行器、固定大小的执行池、每日清理以及后台工作器的生命周期管理
pub mod executor;
pub mod manager;
pub mod pool;
pub mod retention_worker;
pub mod worker;

pub use worker::Worker;
