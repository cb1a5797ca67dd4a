//! Email 邮件渠道
//!
//! `HttpEmailSender` 通过 HTTP 邮件 API（Resend 风格的 JSON 接口）投递；
//! `LoggingEmailSender` 在渠道未启用时只记录日志，便于本地演练。

use std::time::Duration;

use async_trait::async_trait;
use market_shared::config::EmailConfig;
use market_shared::error::MarketError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EmailSender, SendOutcome};
use crate::error::Result;

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct EmailResponse {
    id: Option<String>,
}

/// HTTP 邮件发送器
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    /// 发件人（`名称 <地址>` 格式）
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: &EmailConfig) -> std::result::Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MarketError::Internal(format!("构建邮件 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            from: format!("{} <{}>", config.from_name, config.from_address),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SendOutcome> {
        let request = EmailRequest {
            from: self.from.clone(),
            to: [to],
            subject,
            html,
        };

        debug!(to = %to, subject = %subject, content_length = html.len(), "Email 发送中...");

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(to = %to, error = %e, "Email 请求失败");
                return Ok(SendOutcome::failed(e.to_string(), e.is_timeout() || e.is_connect()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(to = %to, status = %status, body = %body, "Email 服务返回错误");
            return Ok(SendOutcome::failed(
                format!("HTTP {status}: {body}"),
                status.as_u16() == 429 || status.is_server_error(),
            ));
        }

        let message_id = response
            .json::<EmailResponse>()
            .await
            .ok()
            .and_then(|r| r.id);

        info!(to = %to, message_id = ?message_id, "Email 发送成功");
        Ok(SendOutcome::delivered(message_id))
    }

    fn name(&self) -> &str {
        "HttpEmail"
    }
}

/// 仅记录日志的邮件发送器
///
/// 渠道关闭时使用，生产环境替换为 [`HttpEmailSender`]。
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SendOutcome> {
        let message_id = format!("email_{}", Uuid::now_v7());

        info!(
            channel = "EMAIL",
            to = %to,
            subject = %subject,
            content_length = html.len(),
            message_id = %message_id,
            "模拟发送邮件通知"
        );

        Ok(SendOutcome::delivered(Some(message_id)))
    }

    fn name(&self) -> &str {
        "LoggingEmail"
    }
}
