// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 处理器模块
///
/// 任务处理器契约、按任务类型查找的注册表以及内置处理器
pub mod log_handler;
pub mod registry;
pub mod traits;

pub use registry::{HandlerRegistry, RegistryError};
pub use traits::{HandlerError, TaskHandler};
