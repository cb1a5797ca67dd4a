//! 单目标通知分发
//!
//! 先写通知记录，再经由一个渠道发送。记录写入失败是唯一会向调用方返回的
//! 投递阶段错误；发送失败只记录日志，已写入的记录不会回滚。
//! 返回的 [`Notification`] 表示"已记录"，不代表"已送达"。

use std::sync::Arc;

use market_shared::models::{NewNotification, Notification, NotificationChannel};
use market_shared::observability::metrics::{record_channel_send, record_dispatch};
use tracing::{debug, error, info, instrument, warn};

use crate::audience::{AudienceMember, AudienceResolver};
use crate::channels::{EmailSender, SmsGateway};
use crate::error::{NotificationError, Result};
use crate::store::NotificationStore;
use crate::templates::{DispatchEvent, EventKind, RenderedContent, TemplateResolver};

/// 单目标通知分发器
pub struct NotificationDispatcher {
    audience: Arc<AudienceResolver>,
    notifications: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
    sms: SmsGateway,
    templates: Arc<TemplateResolver>,
}

impl NotificationDispatcher {
    pub fn new(
        audience: Arc<AudienceResolver>,
        notifications: Arc<dyn NotificationStore>,
        email: Arc<dyn EmailSender>,
        sms: SmsGateway,
        templates: Arc<TemplateResolver>,
    ) -> Self {
        Self {
            audience,
            notifications,
            email,
            sms,
            templates,
        }
    }

    /// 发送单条通知
    ///
    /// 事件类型由标题识别，见 [`EventKind::classify`]。
    pub async fn dispatch(
        &self,
        receiver_id: &str,
        sender_id: Option<String>,
        order_id: Option<String>,
        channel: NotificationChannel,
        title: &str,
        message: &str,
    ) -> Result<Notification> {
        let event = DispatchEvent {
            kind: EventKind::classify(title),
            title: title.to_string(),
            message: message.to_string(),
            sender_id,
            order_id,
        };
        self.dispatch_event(receiver_id, &event, channel).await
    }

    /// 发送结构化事件通知
    #[instrument(
        skip(self, event),
        fields(receiver_id = %receiver_id, channel = %channel, kind = event.kind.name())
    )]
    pub async fn dispatch_event(
        &self,
        receiver_id: &str,
        event: &DispatchEvent,
        channel: NotificationChannel,
    ) -> Result<Notification> {
        let receiver = self.audience.resolve_receiver(receiver_id).await?;

        let record = NewNotification::new(&receiver.id, channel, &event.title, &event.message)
            .with_sender(event.sender_id.clone())
            .with_order(event.order_id.clone());

        let notification = self
            .notifications
            .insert_notification(&record)
            .await
            .map_err(|e| {
                error!(error = %e, "通知记录写入失败，放弃发送");
                record_dispatch(channel.as_str(), "persist_failed");
                NotificationError::Persistence(e)
            })?;

        record_dispatch(channel.as_str(), "recorded");

        let delivered = self.send(&receiver, event, channel).await;
        info!(notification_id = %notification.id, delivered, "通知已记录");

        Ok(notification)
    }

    async fn send(
        &self,
        receiver: &AudienceMember,
        event: &DispatchEvent,
        channel: NotificationChannel,
    ) -> bool {
        let payload = event.payload(&receiver.name);

        match channel {
            NotificationChannel::InApp => {
                debug!("站内通知无需外部投递");
                true
            }
            NotificationChannel::Email => {
                let content = self
                    .templates
                    .resolve(&event.kind, channel, &payload)
                    .await;
                send_email(self.email.as_ref(), &receiver.email, &content).await
            }
            NotificationChannel::Sms => {
                let Some(phone) = receiver.phone.as_deref() else {
                    let err = NotificationError::MissingContact { channel };
                    warn!(error = %err, "跳过短信发送");
                    return false;
                };
                let content = self
                    .templates
                    .resolve(&event.kind, channel, &payload)
                    .await;
                send_sms(&self.sms, phone, &content.text).await
            }
        }
    }
}

/// 发送邮件并记录结果，任何失败都只记录日志
pub(crate) async fn send_email(
    sender: &dyn EmailSender,
    to: &str,
    content: &RenderedContent,
) -> bool {
    if to.trim().is_empty() {
        let err = NotificationError::MissingContact {
            channel: NotificationChannel::Email,
        };
        warn!(error = %err, "跳过邮件发送");
        record_channel_send(NotificationChannel::Email.as_str(), false);
        return false;
    }

    let delivered = match sender.send(to, &content.subject, &content.html).await {
        Ok(outcome) if outcome.success => {
            debug!(to = %to, message_id = ?outcome.message_id, "邮件已发送");
            true
        }
        Ok(outcome) => {
            let err = NotificationError::SendFailed {
                channel: NotificationChannel::Email,
                reason: outcome.error.unwrap_or_default(),
            };
            warn!(to = %to, error = %err, retryable = outcome.retryable, "邮件发送失败");
            false
        }
        Err(e) => {
            error!(to = %to, error = %e, "邮件发送异常");
            false
        }
    };

    record_channel_send(NotificationChannel::Email.as_str(), delivered);
    delivered
}

/// 通过短信网关发送，无效手机号在网关内被拒绝
pub(crate) async fn send_sms(gateway: &SmsGateway, phone: &str, text: &str) -> bool {
    let delivered = match gateway.send(phone, text).await {
        Ok(outcome) if outcome.success => {
            debug!(phone = %phone, message_id = ?outcome.message_id, "短信已发送");
            true
        }
        Ok(outcome) => {
            let err = NotificationError::SendFailed {
                channel: NotificationChannel::Sms,
                reason: outcome.error.unwrap_or_default(),
            };
            warn!(phone = %phone, error = %err, retryable = outcome.retryable, "短信发送失败");
            false
        }
        Err(e) => {
            warn!(phone = %phone, error = %e, "短信发送被拒绝");
            false
        }
    };

    record_channel_send(NotificationChannel::Sms.as_str(), delivered);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MockEmailSender, MockSmsSender, SendOutcome};
    use crate::store::{MockAnnouncementStore, MockNotificationStore, MockUserStore};
    use chrono::Utc;
    use market_shared::config::SiteConfig;
    use market_shared::error::MarketError;
    use market_shared::models::{User, UserRole};
    use mockall::predicate::*;
    use std::time::Duration;

    fn buyer(phone: Option<&str>) -> User {
        User {
            id: "buyer-1".to_string(),
            email: "amina@example.com".to_string(),
            phone: phone.map(str::to_string),
            name: "Amina".to_string(),
            role: UserRole::Buyer,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    fn users_with(user: User) -> MockUserStore {
        let mut users = MockUserStore::new();
        users
            .expect_get_user()
            .returning(move |_| Ok(Some(user.clone())));
        users
    }

    fn stored(record: &NewNotification) -> Notification {
        Notification {
            id: "n-1".to_string(),
            receiver_id: record.receiver_id.clone(),
            sender_id: record.sender_id.clone(),
            order_id: record.order_id.clone(),
            channel: record.channel,
            title: record.title.clone(),
            message: record.message.clone(),
            is_read: false,
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
        }
    }

    fn dispatcher(
        users: MockUserStore,
        notifications: MockNotificationStore,
        email: MockEmailSender,
        sms: MockSmsSender,
    ) -> NotificationDispatcher {
        let templates = TemplateResolver::new(
            Arc::new(MockAnnouncementStore::new()),
            SiteConfig::default(),
        );
        NotificationDispatcher::new(
            Arc::new(AudienceResolver::new(Arc::new(users), 1000)),
            Arc::new(notifications),
            Arc::new(email),
            SmsGateway::new(Arc::new(sms), Duration::from_secs(10)),
            Arc::new(templates),
        )
    }

    #[tokio::test]
    async fn test_store_failure_rejects_without_sending() {
        let mut notifications = MockNotificationStore::new();
        notifications
            .expect_insert_notification()
            .times(1)
            .returning(|_| Err(MarketError::Internal("deadlock detected".to_string())));
        let mut email = MockEmailSender::new();
        email.expect_send().never();

        let dispatcher = dispatcher(
            users_with(buyer(None)),
            notifications,
            email,
            MockSmsSender::new(),
        );

        let err = dispatcher
            .dispatch(
                "buyer-1",
                None,
                Some("42".to_string()),
                NotificationChannel::Email,
                "Order Shipped",
                "On its way",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, NotificationError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_email_sender_error_is_only_logged() {
        let mut notifications = MockNotificationStore::new();
        notifications
            .expect_insert_notification()
            .times(1)
            .returning(|record| Ok(stored(record)));
        let mut email = MockEmailSender::new();
        email
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(MarketError::Internal("smtp down".to_string()).into()));

        let dispatcher = dispatcher(
            users_with(buyer(None)),
            notifications,
            email,
            MockSmsSender::new(),
        );

        let notification = dispatcher
            .dispatch(
                "buyer-1",
                Some("seller-1".to_string()),
                Some("42".to_string()),
                NotificationChannel::Email,
                "Order Shipped",
                "On its way",
            )
            .await
            .unwrap();

        assert_eq!(notification.receiver_id, "buyer-1");
        assert_eq!(notification.sender_id.as_deref(), Some("seller-1"));
        assert_eq!(notification.order_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_missing_receiver_has_no_side_effects() {
        let mut users = MockUserStore::new();
        users.expect_get_user().returning(|_| Ok(None));
        let mut notifications = MockNotificationStore::new();
        notifications.expect_insert_notification().never();

        let dispatcher = dispatcher(users, notifications, MockEmailSender::new(), MockSmsSender::new());

        let err = dispatcher
            .dispatch("ghost", None, None, NotificationChannel::InApp, "Hello", "Hi")
            .await
            .unwrap_err();

        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_in_app_sends_nothing() {
        let mut notifications = MockNotificationStore::new();
        notifications
            .expect_insert_notification()
            .withf(|record| record.channel == NotificationChannel::InApp)
            .times(1)
            .returning(|record| Ok(stored(record)));
        let mut email = MockEmailSender::new();
        email.expect_send().never();
        let mut sms = MockSmsSender::new();
        sms.expect_send().never();

        let dispatcher = dispatcher(users_with(buyer(Some("0712345678"))), notifications, email, sms);

        let notification = dispatcher
            .dispatch("buyer-1", None, None, NotificationChannel::InApp, "Hello", "Hi")
            .await
            .unwrap();

        assert_eq!(notification.channel, NotificationChannel::InApp);
    }

    #[tokio::test]
    async fn test_sms_uses_rendered_text_and_normalized_phone() {
        let mut notifications = MockNotificationStore::new();
        notifications
            .expect_insert_notification()
            .returning(|record| Ok(stored(record)));
        let mut sms = MockSmsSender::new();
        sms.expect_send()
            .with(
                eq("+254712345678"),
                eq("Order #42 Delivered: Your order #42 has been delivered."),
            )
            .times(1)
            .returning(|_, _| Ok(SendOutcome::delivered(None)));

        let dispatcher = dispatcher(
            users_with(buyer(Some("0712345678"))),
            notifications,
            MockEmailSender::new(),
            sms,
        );

        let event = DispatchEvent::order_status(
            "42",
            crate::templates::OrderStatus::Delivered,
            None,
        );
        dispatcher
            .dispatch_event("buyer-1", &event, NotificationChannel::Sms)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_phone_is_recorded_but_not_sent() {
        let mut notifications = MockNotificationStore::new();
        notifications
            .expect_insert_notification()
            .times(1)
            .returning(|record| Ok(stored(record)));
        let mut sms = MockSmsSender::new();
        sms.expect_send().never();

        let dispatcher = dispatcher(
            users_with(buyer(Some("12345"))),
            notifications,
            MockEmailSender::new(),
            sms,
        );

        let notification = dispatcher
            .dispatch("buyer-1", None, None, NotificationChannel::Sms, "Hello", "Hi")
            .await
            .unwrap();

        assert_eq!(notification.channel, NotificationChannel::Sms);
    }
}
