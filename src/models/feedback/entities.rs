use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 讲师对某条成绩的反馈
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/feedback.ts")]
pub struct Feedback {
    pub id: i64,
    pub grade_id: i64,
    pub student_id: i64,
    pub lecturer_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
