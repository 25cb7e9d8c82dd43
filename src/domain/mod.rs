// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层
///
/// 包含触发任务实体、状态规则以及仓库接口，不依赖具体的存储实现
pub mod models;
pub mod repositories;
