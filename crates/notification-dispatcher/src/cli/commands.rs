//! CLI 命令定义

use clap::{Parser, Subcommand};
use market_shared::models::{NotificationChannel, UserRole};

/// 通知分发命令行工具
#[derive(Parser, Debug)]
#[command(name = "notification-dispatcher")]
#[command(version, about = "市场通知分发工具")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 向目标角色广播公告
    ///
    /// 不指定 `--role` 时面向全部已验证用户。
    Broadcast {
        /// 公告 ID
        #[arg(short, long)]
        announcement_id: String,

        /// 公告作者 ID（不会收到通知）
        #[arg(long)]
        author_id: String,

        /// 目标角色，可重复（BUYER, SELLER, ADMIN）
        #[arg(short, long = "role")]
        roles: Vec<UserRole>,
    },

    /// 向单个接收者发送通知
    Dispatch {
        /// 接收者 ID
        #[arg(short, long)]
        receiver_id: String,

        /// 渠道（EMAIL, SMS, IN_APP）
        #[arg(short, long)]
        channel: NotificationChannel,

        /// 标题，已知标题会匹配对应模板（如 "Order Shipped"）
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        message: String,

        #[arg(long)]
        sender_id: Option<String>,

        #[arg(long)]
        order_id: Option<String>,
    },
}
