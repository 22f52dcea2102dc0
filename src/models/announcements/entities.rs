use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 课程公告
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct Announcement {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub content: String,
    pub created_by: Option<i64>,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
