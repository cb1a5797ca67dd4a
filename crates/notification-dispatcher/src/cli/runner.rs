//! CLI 命令执行器
//!
//! 负责按配置装配分发器：渠道关闭时使用仅记录日志的发送器，开启时使用 HTTP 发送器。

use std::sync::Arc;

use market_shared::config::{AppConfig, EmailConfig, SmsConfig};
use market_shared::error::MarketError;
use market_shared::models::{DispatchResult, Notification, NotificationChannel, RoleFilter, UserRole};
use tracing::info;

use crate::audience::AudienceResolver;
use crate::broadcast::BroadcastDispatcher;
use crate::channels::{
    EmailSender, HttpEmailSender, HttpSmsSender, LoggingEmailSender, LoggingSmsSender, SmsGateway,
    SmsSender,
};
use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;
use crate::store::{AnnouncementStore, NotificationStore, UserStore};
use crate::templates::TemplateResolver;

/// 按配置选择邮件发送器
pub fn email_sender(config: &EmailConfig) -> std::result::Result<Arc<dyn EmailSender>, MarketError> {
    if config.enabled {
        Ok(Arc::new(HttpEmailSender::new(config)?))
    } else {
        Ok(Arc::new(LoggingEmailSender))
    }
}

/// 按配置选择短信发送器
pub fn sms_sender(config: &SmsConfig) -> std::result::Result<Arc<dyn SmsSender>, MarketError> {
    if config.enabled {
        Ok(Arc::new(HttpSmsSender::new(config)?))
    } else {
        Ok(Arc::new(LoggingSmsSender))
    }
}

/// 命令执行器
pub struct CommandRunner {
    dispatcher: NotificationDispatcher,
    broadcaster: BroadcastDispatcher,
}

impl CommandRunner {
    /// 使用同时实现三个存储接口的存储装配
    pub fn new<S>(
        config: &AppConfig,
        store: Arc<S>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
    ) -> Self
    where
        S: UserStore + AnnouncementStore + NotificationStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let announcements: Arc<dyn AnnouncementStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store;

        let audience = Arc::new(AudienceResolver::new(users, config.dispatch.max_audience));
        let templates = Arc::new(TemplateResolver::new(
            announcements.clone(),
            config.site.clone(),
        ));
        let gateway = SmsGateway::from_config(sms, &config.sms);

        info!(
            email_sender = email.name(),
            sms_sender = gateway.sender_name(),
            urgent_sms_mode = ?config.dispatch.urgent_sms_mode,
            "分发器装配完成"
        );

        let dispatcher = NotificationDispatcher::new(
            audience.clone(),
            notifications.clone(),
            email.clone(),
            gateway.clone(),
            templates.clone(),
        );
        let broadcaster = BroadcastDispatcher::new(
            announcements,
            audience,
            notifications,
            email,
            gateway,
            templates,
            config.dispatch.clone(),
        );

        Self {
            dispatcher,
            broadcaster,
        }
    }

    /// 执行广播，空角色列表表示全部用户
    pub async fn run_broadcast(
        &self,
        announcement_id: &str,
        author_id: &str,
        roles: Vec<UserRole>,
    ) -> Result<DispatchResult> {
        let filter = if roles.is_empty() {
            RoleFilter::All
        } else {
            RoleFilter::roles(roles)?
        };

        self.broadcaster
            .broadcast(announcement_id, author_id, &filter)
            .await
    }

    pub async fn run_dispatch(
        &self,
        receiver_id: &str,
        sender_id: Option<String>,
        order_id: Option<String>,
        channel: NotificationChannel,
        title: &str,
        message: &str,
    ) -> Result<Notification> {
        self.dispatcher
            .dispatch(receiver_id, sender_id, order_id, channel, title, message)
            .await
    }
}
