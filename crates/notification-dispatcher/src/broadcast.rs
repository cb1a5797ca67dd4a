//! 公告广播
//!
//! 一对多分发：加载公告，解析受众，按固定批次顺序处理。
//!
//! ## 执行模型
//!
//! - 批次严格串行，批内以 `buffer_unordered` 有界并发处理各用户
//! - 每个用户的处理相互隔离，任何单用户错误只计入失败数
//! - 批次之间经由 [`Throttle`] 暂停（默认固定 1 秒），最后一批之后不暂停
//! - 紧急公告为每个用户额外写入一条 SMS 渠道记录；是否同步发送短信由
//!   [`UrgentSmsMode`] 决定
//!
//! 只有公告不存在与受众解析失败会返回错误，其余结果都汇总在 [`DispatchResult`] 中。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use market_shared::config::{DispatchConfig, UrgentSmsMode};
use market_shared::models::{
    Announcement, DispatchResult, NewNotification, NotificationChannel, RoleFilter,
};
use market_shared::observability::metrics::{record_broadcast, record_dispatch};
use tracing::{debug, info, instrument, warn};

use crate::audience::{AudienceMember, AudienceResolver};
use crate::channels::{EmailSender, SmsGateway};
use crate::dispatcher::{send_email, send_sms};
use crate::error::{NotificationError, Result};
use crate::store::{AnnouncementStore, NotificationStore};
use crate::templates::TemplateResolver;

/// 批次间限速
///
/// `completed_batches` 为已完成的批次数，只在两批之间调用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self, completed_batches: usize);
}

/// 固定间隔限速
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self, completed_batches: usize) {
        debug!(completed_batches, delay_ms = self.delay.as_millis() as u64, "批次间等待");
        tokio::time::sleep(self.delay).await;
    }
}

/// 公告广播分发器
pub struct BroadcastDispatcher {
    announcements: Arc<dyn AnnouncementStore>,
    audience: Arc<AudienceResolver>,
    notifications: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
    sms: SmsGateway,
    templates: Arc<TemplateResolver>,
    config: DispatchConfig,
    throttle: Arc<dyn Throttle>,
}

impl BroadcastDispatcher {
    pub fn new(
        announcements: Arc<dyn AnnouncementStore>,
        audience: Arc<AudienceResolver>,
        notifications: Arc<dyn NotificationStore>,
        email: Arc<dyn EmailSender>,
        sms: SmsGateway,
        templates: Arc<TemplateResolver>,
        config: DispatchConfig,
    ) -> Self {
        let throttle = Arc::new(FixedDelay::new(config.batch_delay()));
        Self {
            announcements,
            audience,
            notifications,
            email,
            sms,
            templates,
            config,
            throttle,
        }
    }

    /// 替换批次间限速策略
    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// 广播公告
    #[instrument(skip(self, roles), fields(roles = %roles))]
    pub async fn broadcast(
        &self,
        announcement_id: &str,
        author_id: &str,
        roles: &RoleFilter,
    ) -> Result<DispatchResult> {
        let start = Instant::now();

        let announcement = self
            .announcements
            .get_announcement(announcement_id)
            .await?
            .ok_or_else(|| NotificationError::AnnouncementNotFound {
                announcement_id: announcement_id.to_string(),
            })?;

        let audience = self.audience.resolve(roles, author_id).await?;
        let total = audience.len();

        if total == 0 {
            info!(announcement_id = %announcement_id, "受众为空，无需分发");
            return Ok(DispatchResult::completed(0, 0, 0));
        }

        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.max_concurrency.max(1);
        let batch_count = total.div_ceil(batch_size);

        info!(
            announcement_id = %announcement_id,
            announcement_type = %announcement.announcement_type,
            total,
            batch_size,
            batch_count,
            "开始广播公告"
        );

        let announcement = &announcement;
        let mut success_count = 0;
        let mut failure_count = 0;

        for (batch_idx, batch) in audience.chunks(batch_size).enumerate() {
            if batch_idx > 0 {
                self.throttle.pause(batch_idx).await;
            }

            let results: Vec<(&AudienceMember, std::result::Result<(), String>)> =
                stream::iter(batch)
                    .map(|member| async move {
                        (member, self.process_member(announcement, member).await)
                    })
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;

            let mut batch_failed = 0;
            for (member, result) in results {
                if let Err(reason) = result {
                    batch_failed += 1;
                    warn!(user_id = %member.id, reason = %reason, "用户通知处理失败");
                }
            }
            let batch_success = batch.len() - batch_failed;

            success_count += batch_success;
            failure_count += batch_failed;

            info!(
                batch = batch_idx + 1,
                batch_count,
                batch_success,
                batch_failed,
                "批次处理完成"
            );
        }

        let elapsed = start.elapsed();
        record_broadcast(
            announcement.announcement_type.as_str(),
            batch_count,
            success_count,
            failure_count,
            elapsed.as_secs_f64(),
        );

        info!(
            announcement_id = %announcement_id,
            total,
            success_count,
            failure_count,
            duration_ms = elapsed.as_millis() as u64,
            "公告广播完成"
        );

        Ok(DispatchResult::completed(total, success_count, failure_count))
    }

    /// 处理单个用户，返回失败原因
    ///
    /// 邮件记录与短信记录相互独立：一条失败不影响另一条的写入。
    async fn process_member(
        &self,
        announcement: &Announcement,
        member: &AudienceMember,
    ) -> std::result::Result<(), String> {
        let mut failures = Vec::new();

        let email_record = self.record(announcement, member, NotificationChannel::Email);
        match self.persist(&email_record).await {
            Ok(()) => {
                let content = self.templates.render_announcement(
                    announcement,
                    NotificationChannel::Email,
                    &member.name,
                );
                if !send_email(self.email.as_ref(), &member.email, &content).await {
                    failures.push("邮件发送失败".to_string());
                }
            }
            Err(e) => failures.push(e.to_string()),
        }

        if announcement.is_urgent() {
            let sms_record = self.record(announcement, member, NotificationChannel::Sms);
            match self.persist(&sms_record).await {
                Ok(()) => {
                    if let Some(reason) = self.send_urgent_sms(announcement, member).await {
                        failures.push(reason);
                    }
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    fn record(
        &self,
        announcement: &Announcement,
        member: &AudienceMember,
        channel: NotificationChannel,
    ) -> NewNotification {
        NewNotification::new(&member.id, channel, &announcement.title, &announcement.content)
            .with_sender(Some(announcement.author_id.clone()))
    }

    async fn persist(&self, record: &NewNotification) -> Result<()> {
        match self.notifications.insert_notification(record).await {
            Ok(_) => {
                record_dispatch(record.channel.as_str(), "recorded");
                Ok(())
            }
            Err(e) => {
                record_dispatch(record.channel.as_str(), "persist_failed");
                Err(NotificationError::Persistence(e))
            }
        }
    }

    /// `Queue` 模式下只保留 SMS 记录，由外部任务投递
    async fn send_urgent_sms(
        &self,
        announcement: &Announcement,
        member: &AudienceMember,
    ) -> Option<String> {
        if self.config.urgent_sms_mode == UrgentSmsMode::Queue {
            return None;
        }

        let Some(phone) = member.phone.as_deref() else {
            debug!(user_id = %member.id, "用户未登记手机号，跳过紧急短信");
            return None;
        };

        let content =
            self.templates
                .render_announcement(announcement, NotificationChannel::Sms, &member.name);
        if send_sms(&self.sms, phone, &content.text).await {
            None
        } else {
            Some("紧急短信发送失败".to_string())
        }
    }
}
