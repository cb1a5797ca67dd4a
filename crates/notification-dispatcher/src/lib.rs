//! 市场通知分发引擎
//!
//! 把业务事件转换为按渠道投递的通知：单目标通知先记录再经由一个渠道发送；
//! 公告广播解析受众后分批处理，单个接收者的失败只计入汇总结果。

pub mod audience;
pub mod broadcast;
pub mod channels;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod store;
pub mod templates;

pub use audience::{AudienceMember, AudienceResolver};
pub use broadcast::{BroadcastDispatcher, FixedDelay, Throttle};
pub use dispatcher::NotificationDispatcher;
pub use error::{NotificationError, Result};
pub use templates::{DispatchEvent, EventKind, OrderStatus, TemplateResolver};
