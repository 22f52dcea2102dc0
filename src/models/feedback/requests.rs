use crate::models::common::{PaginationQuery, deserialize_optional_bool};
use serde::Deserialize;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/feedback.ts")]
pub struct CreateFeedbackRequest {
    pub grade_id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/feedback.ts")]
pub struct FeedbackListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    #[ts(type = "boolean | null")]
    pub unread_only: Option<bool>,
}

// 存储层查询
#[derive(Debug, Clone, Default)]
pub struct FeedbackListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub student_id: Option<i64>,
    pub lecturer_id: Option<i64>,
    pub unread_only: bool,
}
