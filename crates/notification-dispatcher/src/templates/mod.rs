//! 通知模板
//!
//! 根据事件类型与目标渠道生成内容：邮件为带布局的 HTML，短信为简短纯文本，
//! 站内通知直接使用标题与正文。
//!
//! 事件类型由调用方以 [`EventKind`] 结构化传入；旧调用方只能提供标题时，
//! 通过 [`EventKind::classify`] 查表识别。公告类事件凭公告 ID 加载实体，
//! 渲染与公告类型对应的模板。任何查找失败都降级为通用模板，渲染本身从不报错。

mod announcement;
mod layout;

pub use announcement::{AnnouncementStyle, style_for};
pub use layout::escape_html;

use std::fmt;
use std::sync::Arc;

use market_shared::config::SiteConfig;
use market_shared::models::{Announcement, NotificationChannel};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::AnnouncementStore;
use layout::{email_layout, paragraphs};

/// 通用模板的主题色
const GENERIC_COLOR: &str = "#4f46e5";

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    fn sentence(&self, order_ref: &str) -> String {
        match self {
            Self::Placed => format!("We have received your order {order_ref}."),
            Self::Confirmed => format!("Your order {order_ref} has been confirmed by the seller."),
            Self::Shipped => format!("Your order {order_ref} is on its way."),
            Self::Delivered => format!("Your order {order_ref} has been delivered."),
            Self::Cancelled => format!("Your order {order_ref} has been cancelled."),
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Cancelled => "#dc2626",
            Self::Delivered => "#16a34a",
            _ => "#2563eb",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 通知事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    OrderStatus { status: OrderStatus },
    CommentApproved,
    WeeklyDigest,
    /// 公告事件，携带公告 ID
    Announcement { announcement_id: String },
    Generic,
}

impl EventKind {
    /// 由旧式标题识别事件类型
    ///
    /// 只识别已知标签；带公告标记但缺少公告 ID 的标题不做按标题反查，
    /// 与未知标题一样归为 `Generic`。
    pub fn classify(title: &str) -> Self {
        let tag = title.trim().to_lowercase();

        if let Some(kind) = legacy_tag(&tag) {
            return kind;
        }

        if has_announcement_marker(&tag) {
            debug!(title = %title, "公告标记标题缺少公告 ID，使用通用模板");
        }

        Self::Generic
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderStatus { .. } => "ORDER_STATUS",
            Self::CommentApproved => "COMMENT_APPROVED",
            Self::WeeklyDigest => "WEEKLY_DIGEST",
            Self::Announcement { .. } => "ANNOUNCEMENT",
            Self::Generic => "GENERIC",
        }
    }
}

/// 已知的旧式标题标签
fn legacy_tag(tag: &str) -> Option<EventKind> {
    let kind = match tag {
        "new order" | "order placed" => EventKind::OrderStatus {
            status: OrderStatus::Placed,
        },
        "order confirmed" => EventKind::OrderStatus {
            status: OrderStatus::Confirmed,
        },
        "order shipped" => EventKind::OrderStatus {
            status: OrderStatus::Shipped,
        },
        "order delivered" => EventKind::OrderStatus {
            status: OrderStatus::Delivered,
        },
        "order cancelled" | "order canceled" => EventKind::OrderStatus {
            status: OrderStatus::Cancelled,
        },
        "comment approved" => EventKind::CommentApproved,
        "weekly digest" => EventKind::WeeklyDigest,
        _ => return None,
    };
    Some(kind)
}

fn has_announcement_marker(tag: &str) -> bool {
    tag.starts_with('📢') || tag.contains("announcement")
}

/// 模板渲染所需的数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePayload {
    pub recipient_name: String,
    pub title: String,
    pub message: String,
    pub order_id: Option<String>,
}

/// 渲染结果
///
/// `html` 仅对邮件渠道非空；`text` 为纯文本版本（短信正文或站内消息）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// 结构化的通知事件
///
/// 由业务方构造后交给单目标分发器，标题与正文作为通知记录内容保存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchEvent {
    pub kind: EventKind,
    pub title: String,
    pub message: String,
    pub sender_id: Option<String>,
    pub order_id: Option<String>,
}

impl DispatchEvent {
    pub fn order_status(
        order_id: impl Into<String>,
        status: OrderStatus,
        sender_id: Option<String>,
    ) -> Self {
        let order_id = order_id.into();
        Self {
            kind: EventKind::OrderStatus { status },
            title: format!("Order {status}"),
            message: status.sentence(&format!("#{order_id}")),
            sender_id,
            order_id: Some(order_id),
        }
    }

    pub fn comment_approved(product_name: &str) -> Self {
        Self {
            kind: EventKind::CommentApproved,
            title: "Comment Approved".to_string(),
            message: format!("Your comment on {product_name} has been approved and is now visible."),
            sender_id: None,
            order_id: None,
        }
    }

    pub fn weekly_digest(summary: impl Into<String>) -> Self {
        Self {
            kind: EventKind::WeeklyDigest,
            title: "Weekly Digest".to_string(),
            message: summary.into(),
            sender_id: None,
            order_id: None,
        }
    }

    pub fn announcement(announcement: &Announcement) -> Self {
        Self {
            kind: EventKind::Announcement {
                announcement_id: announcement.id.clone(),
            },
            title: announcement.title.clone(),
            message: announcement.content.clone(),
            sender_id: Some(announcement.author_id.clone()),
            order_id: None,
        }
    }

    /// 针对某个接收者生成模板数据
    pub fn payload(&self, recipient_name: &str) -> TemplatePayload {
        TemplatePayload {
            recipient_name: recipient_name.to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            order_id: self.order_id.clone(),
        }
    }
}

/// 模板解析器
pub struct TemplateResolver {
    announcements: Arc<dyn AnnouncementStore>,
    site: SiteConfig,
}

impl TemplateResolver {
    pub fn new(announcements: Arc<dyn AnnouncementStore>, site: SiteConfig) -> Self {
        Self {
            announcements,
            site,
        }
    }

    /// 解析事件内容
    ///
    /// 公告事件按 ID 加载公告；公告不存在或加载失败时降级为通用模板。
    pub async fn resolve(
        &self,
        kind: &EventKind,
        channel: NotificationChannel,
        payload: &TemplatePayload,
    ) -> RenderedContent {
        let EventKind::Announcement { announcement_id } = kind else {
            return self.render(kind, channel, payload);
        };

        match self.announcements.get_announcement(announcement_id).await {
            Ok(Some(announcement)) => {
                self.render_announcement(&announcement, channel, &payload.recipient_name)
            }
            Ok(None) => {
                warn!(announcement_id = %announcement_id, "公告不存在，使用通用模板");
                self.render(&EventKind::Generic, channel, payload)
            }
            Err(e) => {
                warn!(announcement_id = %announcement_id, error = %e, "加载公告失败，使用通用模板");
                self.render(&EventKind::Generic, channel, payload)
            }
        }
    }

    /// 渲染非公告事件（公告事件在此按通用模板处理）
    pub fn render(
        &self,
        kind: &EventKind,
        channel: NotificationChannel,
        payload: &TemplatePayload,
    ) -> RenderedContent {
        if channel == NotificationChannel::InApp {
            return in_app(&payload.title, &payload.message);
        }

        let (subject, body, color) = match kind {
            EventKind::OrderStatus { status } => {
                let order_ref = payload
                    .order_id
                    .as_deref()
                    .map(|id| format!("#{id}"))
                    .unwrap_or_else(|| "your order".to_string());
                let subject = match &payload.order_id {
                    Some(id) => format!("Order #{id} {status}"),
                    None => format!("Order {status}"),
                };
                let mut body = status.sentence(&order_ref);
                if !payload.message.is_empty() && payload.message != body {
                    body = format!("{body}\n\n{}", payload.message);
                }
                (subject, body, status.color())
            }
            EventKind::CommentApproved => (
                "Your comment has been approved".to_string(),
                payload.message.clone(),
                "#16a34a",
            ),
            EventKind::WeeklyDigest => (
                format!("Your weekly digest from {}", self.site.name),
                payload.message.clone(),
                GENERIC_COLOR,
            ),
            EventKind::Announcement { .. } | EventKind::Generic => {
                (payload.title.clone(), payload.message.clone(), GENERIC_COLOR)
            }
        };

        match channel {
            NotificationChannel::Email => {
                let link = payload
                    .order_id
                    .as_ref()
                    .map(|id| format!("{}/orders/{id}", self.site.base_url));
                self.email(&subject, &payload.recipient_name, None, &body, link.as_deref(), color)
            }
            _ => RenderedContent {
                text: format!("{}: {}", subject, first_paragraph(&body)),
                subject,
                html: String::new(),
            },
        }
    }

    /// 渲染公告
    pub fn render_announcement(
        &self,
        announcement: &Announcement,
        channel: NotificationChannel,
        recipient_name: &str,
    ) -> RenderedContent {
        let style = style_for(announcement.announcement_type);

        match channel {
            NotificationChannel::Email => {
                let subject = format!("{} {}: {}", style.icon, style.label, announcement.title);
                let link = format!("{}/announcements/{}", self.site.base_url, announcement.id);
                self.email(
                    &subject,
                    recipient_name,
                    Some(style.description),
                    &announcement.content,
                    Some(&link),
                    style.color,
                )
            }
            NotificationChannel::Sms => {
                let prefix = if announcement.is_urgent() {
                    "URGENT".to_string()
                } else {
                    style.label.to_string()
                };
                RenderedContent {
                    subject: announcement.title.clone(),
                    html: String::new(),
                    text: format!(
                        "{prefix}: {} - {}",
                        announcement.title,
                        first_paragraph(&announcement.content)
                    ),
                }
            }
            NotificationChannel::InApp => in_app(&announcement.title, &announcement.content),
        }
    }

    fn email(
        &self,
        subject: &str,
        recipient_name: &str,
        lead: Option<&str>,
        body: &str,
        link: Option<&str>,
        color: &str,
    ) -> RenderedContent {
        let greeting = if recipient_name.trim().is_empty() {
            "Hi there,".to_string()
        } else {
            format!("Hi {},", recipient_name.trim())
        };

        let mut html = format!("<p>{}</p>\n", escape_html(&greeting));
        if let Some(lead) = lead {
            html.push_str(&format!("<p><em>{}</em></p>\n", escape_html(lead)));
        }
        html.push_str(&paragraphs(&escape_html(body)));
        if let Some(link) = link {
            html.push_str(&format!(
                "\n<p><a href=\"{0}\">{0}</a></p>",
                escape_html(link)
            ));
        }

        RenderedContent {
            subject: subject.to_string(),
            html: email_layout(&self.site, &escape_html(subject), &html, color),
            text: format!("{greeting}\n\n{body}"),
        }
    }
}

fn in_app(title: &str, message: &str) -> RenderedContent {
    RenderedContent {
        subject: title.to_string(),
        html: String::new(),
        text: message.to_string(),
    }
}

fn first_paragraph(text: &str) -> &str {
    text.split("\n\n").next().unwrap_or_default().trim()
}
