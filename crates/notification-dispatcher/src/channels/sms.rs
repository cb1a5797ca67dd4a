//! SMS 短信渠道
//!
//! `HttpSmsSender` 对接 Africa's Talking 风格的短信网关（表单提交 + apiKey 头）；
//! `LoggingSmsSender` 仅记录日志。分发器只通过 [`SmsGateway`] 发送短信：
//! 无效手机号在本地拒绝、不产生任何网络调用，每次调用受硬超时约束。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use market_shared::config::SmsConfig;
use market_shared::error::MarketError;
use market_shared::models::NotificationChannel;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::phone::normalize_msisdn;
use super::{SendOutcome, SmsSender};
use crate::error::{NotificationError, Result};

/// 单段短信的最大字符数
const MAX_SMS_CHARS: usize = 160;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GatewayResponse {
    #[serde(rename = "SMSMessageData")]
    sms_message_data: GatewayMessageData,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GatewayMessageData {
    message: String,
    #[serde(default)]
    recipients: Vec<GatewayRecipient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRecipient {
    status_code: u16,
    status: String,
    message_id: Option<String>,
}

impl GatewayRecipient {
    /// 100 Processed / 101 Sent / 102 Queued 视为已受理
    fn is_accepted(&self) -> bool {
        (100..=102).contains(&self.status_code)
    }

    /// 网关内部错误类状态码可重试
    fn is_retryable(&self) -> bool {
        self.status_code >= 500
    }
}

/// HTTP 短信发送器
pub struct HttpSmsSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    username: String,
    sender_id: Option<String>,
}

impl HttpSmsSender {
    pub fn new(config: &SmsConfig) -> std::result::Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MarketError::Internal(format!("构建短信 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            username: config.username.clone(),
            sender_id: config.sender_id.clone(),
        })
    }

    fn interpret(response: GatewayResponse) -> SendOutcome {
        match response.sms_message_data.recipients.first() {
            Some(recipient) if recipient.is_accepted() => {
                SendOutcome::delivered(recipient.message_id.clone())
            }
            Some(recipient) => SendOutcome::failed(
                format!("{} ({})", recipient.status, recipient.status_code),
                recipient.is_retryable(),
            ),
            None => SendOutcome::failed(response.sms_message_data.message, false),
        }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, phone: &str, message: &str) -> Result<SendOutcome> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("to", phone),
            ("message", message),
        ];
        if let Some(sender_id) = &self.sender_id {
            form.push(("from", sender_id.as_str()));
        }

        debug!(phone = %phone, content_length = message.len(), "SMS 发送中...");

        let response = match self
            .client
            .post(&self.endpoint)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(phone = %phone, error = %e, "SMS 请求失败");
                return Ok(SendOutcome::failed(e.to_string(), e.is_timeout() || e.is_connect()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(phone = %phone, status = %status, body = %body, "SMS 网关返回错误");
            return Ok(SendOutcome::failed(
                format!("HTTP {status}: {body}"),
                status.as_u16() == 429 || status.is_server_error(),
            ));
        }

        let outcome = match response.json::<GatewayResponse>().await {
            Ok(body) => Self::interpret(body),
            Err(e) => SendOutcome::failed(format!("无法解析网关响应: {e}"), false),
        };

        if outcome.success {
            info!(phone = %phone, message_id = ?outcome.message_id, "SMS 发送成功");
        } else {
            warn!(phone = %phone, error = ?outcome.error, "SMS 被网关拒绝");
        }

        Ok(outcome)
    }

    fn name(&self) -> &str {
        "HttpSms"
    }
}

/// 仅记录日志的短信发送器
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send(&self, phone: &str, message: &str) -> Result<SendOutcome> {
        let message_id = format!("sms_{}", Uuid::now_v7());

        info!(
            channel = "SMS",
            phone = %phone,
            body = %message,
            message_id = %message_id,
            "模拟发送短信通知"
        );

        Ok(SendOutcome::delivered(Some(message_id)))
    }

    fn name(&self) -> &str {
        "LoggingSms"
    }
}

/// 短信网关
///
/// 包装任意 [`SmsSender`]：先在本地校验并规范化手机号，再截断正文，
/// 最后在硬超时内调用发送器。超时视为可重试的失败结果。
#[derive(Clone)]
pub struct SmsGateway {
    sender: Arc<dyn SmsSender>,
    timeout: Duration,
}

impl SmsGateway {
    pub fn new(sender: Arc<dyn SmsSender>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    /// 使用配置中的超时（默认 10 秒）
    pub fn from_config(sender: Arc<dyn SmsSender>, config: &SmsConfig) -> Self {
        Self::new(sender, config.timeout())
    }

    pub fn sender_name(&self) -> &str {
        self.sender.name()
    }

    /// 截断过长的内容
    fn truncate_content(content: &str) -> String {
        if content.chars().count() <= MAX_SMS_CHARS {
            content.to_string()
        } else {
            let truncated: String = content.chars().take(MAX_SMS_CHARS - 3).collect();
            format!("{truncated}...")
        }
    }

    /// 发送短信
    ///
    /// 手机号无效时返回 [`NotificationError::InvalidPhone`]，发送器不会被调用。
    pub async fn send(&self, phone: &str, message: &str) -> Result<SendOutcome> {
        let Some(normalized) = normalize_msisdn(phone) else {
            warn!(phone = %phone, "手机号格式无效，本地拒绝发送");
            return Err(NotificationError::InvalidPhone {
                phone: phone.to_string(),
            });
        };

        let content = Self::truncate_content(message);

        match tokio::time::timeout(self.timeout, self.sender.send(&normalized, &content)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    phone = %normalized,
                    sender = self.sender.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "SMS 发送超时"
                );
                Ok(SendOutcome::failed(
                    NotificationError::Timeout {
                        channel: NotificationChannel::Sms,
                    }
                    .to_string(),
                    true,
                ))
            }
        }
    }
}
