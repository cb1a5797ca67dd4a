//! 集成测试公共设施
//!
//! 内存存储 + 可记录调用的发送器与限速器，事件按发生顺序写入共享日志。

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use market_shared::config::{DispatchConfig, SiteConfig};
use market_shared::error::MarketError;
use market_shared::models::{Announcement, AnnouncementType, User, UserRole};
use notification_dispatcher::channels::{EmailSender, SendOutcome, SmsGateway, SmsSender};
use notification_dispatcher::store::{AnnouncementStore, MemoryStore};
use notification_dispatcher::{
    AudienceResolver, BroadcastDispatcher, NotificationDispatcher, Result, TemplateResolver,
    Throttle,
};
use parking_lot::Mutex;

pub const AUTHOR_ID: &str = "admin-author";

/// 有序事件日志
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Email(String),
    Sms(String),
    Pause(usize),
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn pauses(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Pause(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// 按暂停点切分出的各批次邮件收件人
    pub fn email_batches(&self) -> Vec<Vec<String>> {
        let mut batches = vec![Vec::new()];
        for event in self.events() {
            match event {
                Event::Email(to) => batches.last_mut().unwrap().push(to),
                Event::Pause(_) => batches.push(Vec::new()),
                Event::Sms(_) => {}
            }
        }
        batches
    }
}

/// 记录调用的邮件发送器
///
/// `rejected` 中的地址返回失败结果，`broken` 中的地址返回错误。
/// 每次调用按收件人地址休眠若干毫秒，使批内完成顺序交错。
pub struct RecordingEmailSender {
    log: EventLog,
    rejected: Mutex<HashSet<String>>,
    broken: Mutex<HashSet<String>>,
    subjects: Mutex<Vec<String>>,
}

impl RecordingEmailSender {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            rejected: Mutex::new(HashSet::new()),
            broken: Mutex::new(HashSet::new()),
            subjects: Mutex::new(Vec::new()),
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.subjects.lock().clone()
    }

    pub fn reject(&self, to: &str) {
        self.rejected.lock().insert(to.to_string());
    }

    pub fn break_for(&self, to: &str) {
        self.broken.lock().insert(to.to_string());
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Email(to) => Some(to),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<SendOutcome> {
        let jitter = to.bytes().map(u64::from).sum::<u64>() % 7;
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        self.log.push(Event::Email(to.to_string()));
        self.subjects.lock().push(subject.to_string());

        if self.broken.lock().contains(to) {
            return Err(MarketError::ExternalService {
                service: "email".to_string(),
                message: "connection reset".to_string(),
            }
            .into());
        }
        if self.rejected.lock().contains(to) {
            return Ok(SendOutcome::failed("mailbox unavailable", false));
        }
        Ok(SendOutcome::delivered(Some(format!("msg-{to}"))))
    }

    fn name(&self) -> &str {
        "RecordingEmail"
    }
}

/// 记录调用的短信发送器
pub struct RecordingSmsSender {
    log: EventLog,
    messages: Mutex<Vec<String>>,
}

impl RecordingSmsSender {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Sms(phone) => Some(phone),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send(&self, phone: &str, message: &str) -> Result<SendOutcome> {
        self.log.push(Event::Sms(phone.to_string()));
        self.messages.lock().push(message.to_string());
        Ok(SendOutcome::delivered(None))
    }

    fn name(&self) -> &str {
        "RecordingSms"
    }
}

/// 只记录不等待的限速器
pub struct RecordingThrottle {
    log: EventLog,
}

#[async_trait]
impl Throttle for RecordingThrottle {
    async fn pause(&self, completed_batches: usize) {
        self.log.push(Event::Pause(completed_batches));
    }
}

pub fn user(id: &str, role: UserRole, verified: bool, phone: Option<&str>) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        phone: phone.map(str::to_string),
        name: format!("User {id}"),
        role,
        is_verified: verified,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// 写入 `count` 个已验证的买家，ID 为 `{prefix}-000` 起
pub fn seed_buyers(store: &MemoryStore, prefix: &str, count: usize) {
    for i in 0..count {
        let phone = format!("07{i:08}");
        store.add_user(user(&format!("{prefix}-{i:03}"), UserRole::Buyer, true, Some(&phone)));
    }
}

pub fn announcement(id: &str, announcement_type: AnnouncementType) -> Announcement {
    Announcement {
        id: id.to_string(),
        title: "Market update".to_string(),
        content: "The market opens at 6am tomorrow.".to_string(),
        announcement_type,
        author_id: AUTHOR_ID.to_string(),
        created_at: Utc::now(),
    }
}

/// 测试装配
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub email: Arc<RecordingEmailSender>,
    pub sms: Arc<RecordingSmsSender>,
    pub log: EventLog,
    pub config: DispatchConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        let log = EventLog::default();
        Self {
            store: Arc::new(MemoryStore::new()),
            email: Arc::new(RecordingEmailSender::new(log.clone())),
            sms: Arc::new(RecordingSmsSender::new(log.clone())),
            log,
            config,
        }
    }

    fn parts(&self) -> (Arc<AudienceResolver>, Arc<TemplateResolver>, SmsGateway) {
        let audience = Arc::new(AudienceResolver::new(
            self.store.clone(),
            self.config.max_audience,
        ));
        let announcements: Arc<dyn AnnouncementStore> = self.store.clone();
        let templates = Arc::new(TemplateResolver::new(announcements, SiteConfig::default()));
        let gateway = SmsGateway::new(self.sms.clone(), Duration::from_secs(10));
        (audience, templates, gateway)
    }

    /// 使用记录型限速器的广播分发器
    pub fn broadcaster(&self) -> BroadcastDispatcher {
        self.broadcaster_with_default_throttle()
            .with_throttle(Arc::new(RecordingThrottle {
                log: self.log.clone(),
            }))
    }

    /// 使用默认固定间隔限速的广播分发器
    pub fn broadcaster_with_default_throttle(&self) -> BroadcastDispatcher {
        let (audience, templates, gateway) = self.parts();
        BroadcastDispatcher::new(
            self.store.clone(),
            audience,
            self.store.clone(),
            self.email.clone(),
            gateway,
            templates,
            self.config.clone(),
        )
    }

    pub fn dispatcher(&self) -> NotificationDispatcher {
        let (audience, templates, gateway) = self.parts();
        NotificationDispatcher::new(
            audience,
            self.store.clone(),
            self.email.clone(),
            gateway,
            templates,
        )
    }
}
