//! 领域模型
//!
//! 定义通知分发引擎读写的实体：用户、公告、通知记录，以及渠道、角色等枚举。
//! 枚举统一序列化为 SCREAMING_SNAKE_CASE，`Display`/`FromStr` 与 serde 保持一致，
//! 便于以 TEXT 列存储并在日志中统一引用。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

// ---------------------------------------------------------------------------
// NotificationChannel：投递渠道
// ---------------------------------------------------------------------------

/// 通知投递渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Email,
    Sms,
    /// 站内通知，记录本身即为投递
    InApp,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::InApp => "IN_APP",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "IN_APP" => Ok(Self::InApp),
            other => Err(MarketError::InvalidArgument {
                field: "channel".to_string(),
                message: format!("未知渠道: {other}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// UserRole / RoleFilter：受众角色
// ---------------------------------------------------------------------------

/// 市场用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Buyer,
    Seller,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUYER" => Ok(Self::Buyer),
            "SELLER" => Ok(Self::Seller),
            "ADMIN" => Ok(Self::Admin),
            other => Err(MarketError::InvalidArgument {
                field: "role".to_string(),
                message: format!("未知角色: {other}"),
            }),
        }
    }
}

/// 受众角色过滤条件
///
/// `All` 表示全部已验证用户；`Roles` 必须非空，空集合在构造与反序列化时即被拒绝。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "RawRoleFilter")]
pub enum RoleFilter {
    #[default]
    All,
    Roles(Vec<UserRole>),
}

/// 反序列化中间形式，经 `RoleFilter::roles` 校验后转换
#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum RawRoleFilter {
    All,
    Roles(Vec<UserRole>),
}

impl TryFrom<RawRoleFilter> for RoleFilter {
    type Error = MarketError;

    fn try_from(raw: RawRoleFilter) -> Result<Self, Self::Error> {
        match raw {
            RawRoleFilter::All => Ok(Self::All),
            RawRoleFilter::Roles(roles) => Self::roles(roles),
        }
    }
}

impl RoleFilter {
    /// 构造显式角色过滤，重复角色会被去重
    pub fn roles(roles: impl IntoIterator<Item = UserRole>) -> Result<Self, MarketError> {
        let mut unique: Vec<UserRole> = Vec::new();
        for role in roles {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }

        if unique.is_empty() {
            return Err(MarketError::Validation(
                "角色过滤条件不能为空集合，全体用户请使用 ALL".to_string(),
            ));
        }

        Ok(Self::Roles(unique))
    }

    pub fn matches(&self, role: UserRole) -> bool {
        match self {
            Self::All => true,
            Self::Roles(roles) => roles.contains(&role),
        }
    }

    /// 显式角色列表的字符串形式（`All` 返回 None）
    pub fn role_names(&self) -> Option<Vec<String>> {
        match self {
            Self::All => None,
            Self::Roles(roles) => Some(roles.iter().map(|r| r.as_str().to_string()).collect()),
        }
    }
}

impl fmt::Display for RoleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Roles(roles) => {
                let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// 用户（只读输入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub name: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Announcement
// ---------------------------------------------------------------------------

/// 公告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnouncementType {
    General,
    Urgent,
    Event,
    Promotion,
    Sale,
    ProductLaunch,
    Discount,
    SlaughterSchedule,
}

impl AnnouncementType {
    pub const ALL: [AnnouncementType; 8] = [
        Self::General,
        Self::Urgent,
        Self::Event,
        Self::Promotion,
        Self::Sale,
        Self::ProductLaunch,
        Self::Discount,
        Self::SlaughterSchedule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Urgent => "URGENT",
            Self::Event => "EVENT",
            Self::Promotion => "PROMOTION",
            Self::Sale => "SALE",
            Self::ProductLaunch => "PRODUCT_LAUNCH",
            Self::Discount => "DISCOUNT",
            Self::SlaughterSchedule => "SLAUGHTER_SCHEDULE",
        }
    }
}

impl fmt::Display for AnnouncementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnouncementType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| MarketError::InvalidArgument {
                field: "announcement_type".to_string(),
                message: format!("未知公告类型: {s}"),
            })
    }
}

/// 公告（由外部协作方撰写，只读输入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub announcement_type: AnnouncementType,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn is_urgent(&self) -> bool {
        self.announcement_type == AnnouncementType::Urgent
    }
}

// ---------------------------------------------------------------------------
// Notification：通知记录
// ---------------------------------------------------------------------------

/// 已持久化的通知记录
///
/// 每条记录只有一个接收者。`sent_at` 表示"已尝试投递"，而非"已送达"。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub receiver_id: String,
    pub sender_id: Option<String>,
    pub order_id: Option<String>,
    pub channel: NotificationChannel,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// 待写入的通知记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub receiver_id: String,
    pub sender_id: Option<String>,
    pub order_id: Option<String>,
    pub channel: NotificationChannel,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    pub fn new(
        receiver_id: impl Into<String>,
        channel: NotificationChannel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            sender_id: None,
            order_id: None,
            channel,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn with_sender(mut self, sender_id: Option<String>) -> Self {
        self.sender_id = sender_id;
        self
    }

    pub fn with_order(mut self, order_id: Option<String>) -> Self {
        self.order_id = order_id;
        self
    }
}

// ---------------------------------------------------------------------------
// DispatchResult：广播汇总结果
// ---------------------------------------------------------------------------

/// 广播分发的汇总结果
///
/// 调用方只能看到汇总计数，单个接收者的失败只体现在日志中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    pub total_targeted: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl DispatchResult {
    pub fn completed(total_targeted: usize, success_count: usize, failure_count: usize) -> Self {
        Self {
            success: true,
            total_targeted,
            success_count,
            failure_count,
        }
    }

    /// 是否有部分接收者失败
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }
}
