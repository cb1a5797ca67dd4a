//! PostgreSQL 存储实现
//!
//! 使用运行时校验的 sqlx 查询，行结构先映射为 `*Row` 再转换为领域模型，
//! 枚举列以 TEXT 存储。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use market_shared::error::Result;
use market_shared::models::{
    Announcement, NewNotification, Notification, RoleFilter, User, UserRole,
};

use super::{AnnouncementStore, NotificationStore, UserStore};

/// 基于 PgPool 的存储实现，同时实现三个存储接口
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    phone: Option<String>,
    name: String,
    role: String,
    is_verified: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = market_shared::error::MarketError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            email: row.email,
            phone: row.phone,
            name: row.name,
            role: row.role.parse()?,
            is_verified: row.is_verified,
            created_at: row.created_at,
        })
    }
}

/// 受众查询允许的角色：显式过滤时为所选角色，否则为全部已知角色
fn role_names_for(filter: &RoleFilter) -> Vec<String> {
    filter.role_names().unwrap_or_else(|| {
        [UserRole::Buyer, UserRole::Seller, UserRole::Admin]
            .iter()
            .map(|r| r.as_str().to_string())
            .collect()
    })
}

/// 逐行转换，无法解析的行记录告警后跳过
fn users_from_rows(rows: Vec<UserRow>) -> Vec<User> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            User::try_from(row)
                .inspect_err(|e| warn!(user_id = %id, error = %e, "用户记录无法解析，已跳过"))
                .ok()
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    id: String,
    title: String,
    content: String,
    announcement_type: String,
    author_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnnouncementRow> for Announcement {
    type Error = market_shared::error::MarketError;

    fn try_from(row: AnnouncementRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            title: row.title,
            content: row.content,
            announcement_type: row.announcement_type.parse()?,
            author_id: row.author_id,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    receiver_id: String,
    sender_id: Option<String>,
    order_id: Option<String>,
    channel: String,
    title: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = market_shared::error::MarketError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            receiver_id: row.receiver_id,
            sender_id: row.sender_id,
            order_id: row.order_id,
            channel: row.channel.parse()?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
            sent_at: row.sent_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_users(
        &self,
        filter: &RoleFilter,
        exclude_id: &str,
        verified_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<User>> {
        // 未知角色的行在 SQL 中即被排除，不占用 LIMIT；LIMIT NULL 等价于不限制
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, phone, name, role, is_verified, created_at
            FROM users
            WHERE id <> $1
              AND ($2 = FALSE OR is_verified = TRUE)
              AND role = ANY($3::text[])
            ORDER BY created_at ASC, id ASC
            LIMIT $4
            "#,
        )
        .bind(exclude_id)
        .bind(verified_only)
        .bind(role_names_for(filter))
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(users_from_rows(rows))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, phone, name, role, is_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl AnnouncementStore for PgStore {
    async fn get_announcement(&self, id: &str) -> Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>(
            r#"
            SELECT id, title, content, type AS announcement_type, author_id, created_at
            FROM announcements
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Announcement::try_from).transpose()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, record: &NewNotification) -> Result<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications
                (id, receiver_id, sender_id, order_id, channel, title, message,
                 is_read, created_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW(), NOW())
            RETURNING id, receiver_id, sender_id, order_id, channel, title, message,
                      is_read, created_at, sent_at
            "#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&record.receiver_id)
        .bind(&record.sender_id)
        .bind(&record.order_id)
        .bind(record.channel.as_str())
        .bind(&record.title)
        .bind(&record.message)
        .fetch_one(&self.pool)
        .await?;

        Notification::try_from(row)
    }
}
