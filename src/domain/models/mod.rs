// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含触发任务实体及其关联上下文
pub mod correlation;
pub mod trigger_task;
