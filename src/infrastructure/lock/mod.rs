// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 分布式锁模块
///
/// 锁后端（Redis、进程内）以及在其上构建的领导者锁和任务锁
pub mod backend;
pub mod coordinator;
pub mod local_lock;
pub mod redis_lock;

pub use backend::{LockBackend, LockError};
pub use coordinator::{LockCoordinator, LockGuard};
