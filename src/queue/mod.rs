// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 生产者入口、重试退避策略和扫描调度
pub mod backoff;
pub mod scheduler;
pub mod task_queue;
