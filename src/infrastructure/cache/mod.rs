// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// Redis客户端以及退避上限使用的计数器存储
pub mod counter_store;
pub mod redis_client;
