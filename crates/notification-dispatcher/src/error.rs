//! 通知分发错误类型
//!
//! 只有结构性错误（公告或接收者不存在、持久化失败、受众解析失败）会返回给调用方；
//! 校验错误与投递错误局限于单个接收者，由分发器计数并记录日志。

use market_shared::error::MarketError;
use market_shared::models::NotificationChannel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("公告不存在: {announcement_id}")]
    AnnouncementNotFound { announcement_id: String },

    #[error("接收者不存在: {receiver_id}")]
    ReceiverNotFound { receiver_id: String },

    #[error("通知记录持久化失败: {0}")]
    Persistence(#[source] MarketError),

    #[error("受众解析失败: {0}")]
    AudienceResolution(#[source] MarketError),

    #[error("手机号格式无效: {phone}")]
    InvalidPhone { phone: String },

    #[error("接收者缺少 {channel} 渠道的联系方式")]
    MissingContact { channel: NotificationChannel },

    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed {
        channel: NotificationChannel,
        reason: String,
    },

    #[error("通知发送超时: 渠道={channel}")]
    Timeout { channel: NotificationChannel },

    #[error(transparent)]
    Shared(#[from] MarketError),
}

pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    /// 是否为前置条件错误（发生在任何副作用之前）
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AnnouncementNotFound { .. } | Self::ReceiverNotFound { .. }
        )
    }
}
