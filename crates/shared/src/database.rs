//! PostgreSQL 连接池
//!
//! 用户、公告与通知记录表由市场主应用维护，这里只负责建立连接池并在启动时确认可用。

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::{MarketError, Result};

/// 连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 建立连接池并执行一次探活查询
    #[instrument(skip_all, fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .inspect_err(|e| warn!(error = %e, "数据库连接失败"))?;

        let db = Self { pool };
        db.ping().await?;

        info!(
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "数据库连接池已就绪"
        );
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 探活
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(MarketError::from)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // 需要数据库连接
    async fn test_connect_and_ping() {
        let config = DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| DatabaseConfig::default().url),
            max_connections: 2,
            min_connections: 1,
            ..Default::default()
        };

        let db = Database::connect(&config).await.unwrap();
        assert!(db.ping().await.is_ok());
        db.close().await;
        assert!(db.pool().is_closed());
    }
}
