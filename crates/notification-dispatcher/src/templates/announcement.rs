//! 公告类型样式
//!
//! 八种公告类型各自对应图标、主题色与一句说明，用于渲染类型化的公告模板。

use market_shared::models::AnnouncementType;

/// 公告样式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementStyle {
    pub icon: &'static str,
    /// 主题色（CSS 十六进制）
    pub color: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// 获取公告类型对应的样式
pub fn style_for(announcement_type: AnnouncementType) -> AnnouncementStyle {
    match announcement_type {
        AnnouncementType::General => AnnouncementStyle {
            icon: "📢",
            color: "#2563eb",
            label: "Announcement",
            description: "News and updates from the marketplace team.",
        },
        AnnouncementType::Urgent => AnnouncementStyle {
            icon: "🚨",
            color: "#dc2626",
            label: "Urgent Notice",
            description: "This notice needs your immediate attention.",
        },
        AnnouncementType::Event => AnnouncementStyle {
            icon: "📅",
            color: "#7c3aed",
            label: "Upcoming Event",
            description: "Join us at an upcoming marketplace event.",
        },
        AnnouncementType::Promotion => AnnouncementStyle {
            icon: "🎉",
            color: "#db2777",
            label: "Promotion",
            description: "A limited-time promotion for our community.",
        },
        AnnouncementType::Sale => AnnouncementStyle {
            icon: "🏷️",
            color: "#ea580c",
            label: "Sale",
            description: "Great prices on selected products while stocks last.",
        },
        AnnouncementType::ProductLaunch => AnnouncementStyle {
            icon: "🚀",
            color: "#0891b2",
            label: "New Product",
            description: "Something new has just arrived on the marketplace.",
        },
        AnnouncementType::Discount => AnnouncementStyle {
            icon: "💸",
            color: "#16a34a",
            label: "Discount",
            description: "Save on your next purchase with this discount.",
        },
        AnnouncementType::SlaughterSchedule => AnnouncementStyle {
            icon: "🐄",
            color: "#92400e",
            label: "Slaughter Schedule",
            description: "Updated slaughter and collection schedule for the coming days.",
        },
    }
}
