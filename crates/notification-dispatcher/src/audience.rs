//! 受众解析
//!
//! 把角色过滤条件解析为有序的接收者列表：只包含已验证用户，排除事件发起者，
//! 超出上限时按检索顺序截断。相同的底层数据总是得到相同的结果。

use std::sync::Arc;

use market_shared::error::MarketError;
use market_shared::models::{RoleFilter, User, UserRole};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{NotificationError, Result};
use crate::store::UserStore;

/// 受众成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceMember {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
}

impl From<User> for AudienceMember {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            phone: user.phone,
        }
    }
}

/// 受众解析器
pub struct AudienceResolver {
    users: Arc<dyn UserStore>,
    max_audience: usize,
}

impl AudienceResolver {
    pub fn new(users: Arc<dyn UserStore>, max_audience: usize) -> Self {
        Self {
            users,
            max_audience,
        }
    }

    pub fn max_audience(&self) -> usize {
        self.max_audience
    }

    /// 解析广播受众
    ///
    /// 存储层已按条件过滤，此处再次校验，结果中不含未验证用户与发起者。
    /// 空的显式角色集合在访问存储之前即被拒绝。
    pub async fn resolve(&self, filter: &RoleFilter, exclude_id: &str) -> Result<Vec<AudienceMember>> {
        if matches!(filter, RoleFilter::Roles(roles) if roles.is_empty()) {
            return Err(MarketError::Validation(
                "角色过滤条件不能为空集合，全体用户请使用 ALL".to_string(),
            )
            .into());
        }

        let users = self
            .users
            .find_users(filter, exclude_id, true, Some(self.max_audience))
            .await
            .map_err(NotificationError::AudienceResolution)?;

        let fetched = users.len();
        let mut audience: Vec<AudienceMember> = users
            .into_iter()
            .filter(|u| u.is_verified && u.id != exclude_id && filter.matches(u.role))
            .map(AudienceMember::from)
            .collect();

        if audience.len() < fetched {
            warn!(
                dropped = fetched - audience.len(),
                "存储返回了不符合受众条件的用户，已过滤"
            );
        }

        if audience.len() > self.max_audience {
            debug!(
                matched = audience.len(),
                max_audience = self.max_audience,
                "受众超过上限，按检索顺序截断"
            );
            audience.truncate(self.max_audience);
        }

        debug!(filter = %filter, exclude_id = %exclude_id, size = audience.len(), "受众解析完成");
        Ok(audience)
    }

    /// 解析单个接收者
    ///
    /// 单目标通知由业务方显式指定接收者，不做验证状态过滤。
    pub async fn resolve_receiver(&self, receiver_id: &str) -> Result<AudienceMember> {
        self.users
            .get_user(receiver_id)
            .await
            .map_err(NotificationError::AudienceResolution)?
            .map(AudienceMember::from)
            .ok_or_else(|| NotificationError::ReceiverNotFound {
                receiver_id: receiver_id.to_string(),
            })
    }
}
