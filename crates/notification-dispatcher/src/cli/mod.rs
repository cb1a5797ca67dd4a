//! CLI 模块
//!
//! - `broadcast` - 向目标角色广播公告
//! - `dispatch` - 向单个接收者发送通知
//!
//! # 使用示例
//!
//! ```bash
//! notification-dispatcher broadcast -a ann-1 --author-id admin-1 --role SELLER
//! notification-dispatcher dispatch -r buyer-1 -c EMAIL -t "Order Shipped" -m "On its way" --order-id 42
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, email_sender, sms_sender};
