//! 存储接口
//!
//! 用户、公告、通知记录都由外部存储持有，分发引擎只通过以下窄接口访问。
//! 服务层依赖抽象而非具体实现，便于 mock 测试。

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use market_shared::error::Result;
use market_shared::models::{Announcement, NewNotification, Notification, RoleFilter, User};

/// 用户存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 按角色过滤查询用户，排除 `exclude_id`
    ///
    /// 返回顺序必须确定（创建时间、ID 升序），受众截断依赖此顺序。
    async fn find_users(
        &self,
        filter: &RoleFilter,
        exclude_id: &str,
        verified_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<User>>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;
}

/// 公告存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn get_announcement(&self, id: &str) -> Result<Option<Announcement>>;
}

/// 通知记录存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// 写入一条通知记录，失败时返回错误
    async fn insert_notification(&self, record: &NewNotification) -> Result<Notification>;
}
