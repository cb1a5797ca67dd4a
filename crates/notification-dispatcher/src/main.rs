//! 通知分发服务
//!
//! 命令行入口：加载配置、初始化可观测性、连接数据库后执行子命令，结果以 JSON 输出。

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use market_shared::{config::AppConfig, database::Database, observability};
use tracing::info;

use notification_dispatcher::cli::{Cli, CommandRunner, Commands, email_sender, sms_sender};
use notification_dispatcher::store::{AnnouncementStore, NotificationStore, PgStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load("notification-dispatcher")?;
    observability::init(&config.service_name, &config.observability)?;

    info!(environment = %config.environment, "Configuration loaded");

    let db = Database::connect(&config.database).await?;
    let store = Arc::new(PgStore::new(db.pool().clone()));

    // 无论子命令成功与否都先关闭连接池，再返回结果
    let outcome = execute(cli.command, &config, store).await;
    db.close().await;

    println!("{}", outcome?);
    Ok(())
}

/// 装配执行器并运行子命令，返回 JSON 输出
async fn execute<S>(command: Commands, config: &AppConfig, store: Arc<S>) -> Result<String>
where
    S: UserStore + AnnouncementStore + NotificationStore + 'static,
{
    let runner = CommandRunner::new(
        config,
        store,
        email_sender(&config.email)?,
        sms_sender(&config.sms)?,
    );

    let output = match command {
        Commands::Broadcast {
            announcement_id,
            author_id,
            roles,
        } => {
            let result = runner
                .run_broadcast(&announcement_id, &author_id, roles)
                .await?;
            serde_json::to_string_pretty(&result)?
        }
        Commands::Dispatch {
            receiver_id,
            channel,
            title,
            message,
            sender_id,
            order_id,
        } => {
            let notification = runner
                .run_dispatch(&receiver_id, sender_id, order_id, channel, &title, &message)
                .await?;
            serde_json::to_string_pretty(&notification)?
        }
    };

    Ok(output)
}
