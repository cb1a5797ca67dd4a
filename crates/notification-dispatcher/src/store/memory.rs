//! 内存存储
//!
//! 同时实现三个存储接口，适用于本地演练和集成测试。
//! 用户保持插入顺序以获得确定的检索顺序；可针对指定接收者注入写入失败。

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use market_shared::error::{MarketError, Result};
use market_shared::models::{
    Announcement, NewNotification, Notification, NotificationChannel, RoleFilter, User,
};

use super::{AnnouncementStore, NotificationStore, UserStore};

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    announcements: DashMap<String, Announcement>,
    notifications: Mutex<Vec<Notification>>,
    /// 写入时应失败的接收者
    failing_receivers: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加用户（同 ID 覆盖原有数据并保留原位置）
    pub fn add_user(&self, user: User) {
        let mut users = self.users.write();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
    }

    pub fn add_announcement(&self, announcement: Announcement) {
        self.announcements
            .insert(announcement.id.clone(), announcement);
    }

    /// 之后写给该接收者的通知记录都会失败
    pub fn fail_inserts_for(&self, receiver_id: impl Into<String>) {
        self.failing_receivers.insert(receiver_id.into());
    }

    /// 按写入顺序返回所有通知记录
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn notifications_for(&self, receiver_id: &str) -> Vec<Notification> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.receiver_id == receiver_id)
            .cloned()
            .collect()
    }

    pub fn count_by_channel(&self, channel: NotificationChannel) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.channel == channel)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_users(
        &self,
        filter: &RoleFilter,
        exclude_id: &str,
        verified_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<User>> {
        let users = self.users.read();
        let matched = users
            .iter()
            .filter(|u| u.id != exclude_id)
            .filter(|u| !verified_only || u.is_verified)
            .filter(|u| filter.matches(u.role))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(matched)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn get_announcement(&self, id: &str) -> Result<Option<Announcement>> {
        Ok(self.announcements.get(id).map(|a| a.clone()))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, record: &NewNotification) -> Result<Notification> {
        if self.failing_receivers.contains(&record.receiver_id) {
            return Err(MarketError::Internal(format!(
                "模拟写入失败: receiver_id={}",
                record.receiver_id
            )));
        }

        let now = Utc::now();
        let notification = Notification {
            id: Uuid::now_v7().to_string(),
            receiver_id: record.receiver_id.clone(),
            sender_id: record.sender_id.clone(),
            order_id: record.order_id.clone(),
            channel: record.channel,
            title: record.title.clone(),
            message: record.message.clone(),
            is_read: false,
            created_at: now,
            sent_at: Some(now),
        };

        self.notifications.lock().push(notification.clone());
        Ok(notification)
    }
}
