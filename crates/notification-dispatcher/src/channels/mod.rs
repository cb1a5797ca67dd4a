//! 投递渠道
//!
//! 定义邮件与短信发送器的契约并提供具体实现。
//!
//! ## 支持的渠道
//!
//! - **Email**: HTTP 邮件 API（`HttpEmailSender`），或仅记录日志的 `LoggingEmailSender`
//! - **SMS**: HTTP 短信网关（`HttpSmsSender`），或仅记录日志的 `LoggingSmsSender`；
//!   分发器始终经由 [`SmsGateway`] 调用，手机号校验与超时在网关内完成
//!
//! 对分发器而言发送是 fire-and-forget 的：失败只记录并计数，本子系统从不重试。

mod email;
mod phone;
mod sms;

pub use email::{HttpEmailSender, LoggingEmailSender};
pub use phone::{is_valid_msisdn, normalize_msisdn};
pub use sms::{HttpSmsSender, LoggingSmsSender, SmsGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 单次发送的结果
///
/// 发送器应当把可预期的失败（网关拒绝、HTTP 错误）表达为 `success = false`，
/// 只有无法得到结果的情况才返回 `Err`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// 发送方认为可重试（仅作信息用途）
    pub retryable: bool,
    /// 外部渠道返回的消息标识
    pub message_id: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            retryable: false,
            message_id,
        }
    }

    pub fn failed(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            retryable,
            message_id: None,
        }
    }
}

/// 邮件发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SendOutcome>;

    /// 发送器名称（用于日志）
    fn name(&self) -> &str;
}

/// 短信发送器
///
/// 实现方只负责网络调用；手机号校验、规范化与超时由 [`SmsGateway`] 统一处理。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<SendOutcome>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_outcome_constructors() {
        let ok = SendOutcome::delivered(Some("msg-1".to_string()));
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert_eq!(ok.message_id.as_deref(), Some("msg-1"));

        let failed = SendOutcome::failed("rate limited", true);
        assert!(!failed.success);
        assert!(failed.retryable);
        assert_eq!(failed.error.as_deref(), Some("rate limited"));
    }
}
