use super::entities::NotificationType;
use crate::models::common::{PaginationQuery, deserialize_optional_bool};
use serde::Deserialize;
use ts_rs::TS;

/// 通知列表查询参数
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    #[ts(type = "boolean | null")]
    pub is_read: Option<bool>,
    pub notification_type: Option<NotificationType>,
}

// 存储层查询
#[derive(Debug, Clone, Default)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub is_read: Option<bool>,
    pub notification_type: Option<NotificationType>,
}
