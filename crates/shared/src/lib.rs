//! 共享库
//!
//! 包含通知分发引擎共用的配置、错误处理、领域模型、数据库连接与可观测性基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod observability;
