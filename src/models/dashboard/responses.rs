use serde::Serialize;
use ts_rs::TS;

use crate::models::assignments::entities::Assignment;
use crate::models::grades::responses::GradeListItem;

/// 讲师/管理员统计
#[derive(Debug, Default, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct DashboardStats {
    pub total_courses: i64,
    pub total_students: i64,
    pub total_grades: i64,
    pub average_grade: f64,
    pub pending_grades: i64,
    pub published_grades: i64,
}

/// 学生首页
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct StudentDashboard {
    pub enrolled_courses: i64,
    pub unread_notifications: i64,
    pub average_percentage: Option<f64>,
    pub recent_grades: Vec<GradeListItem>,
    pub upcoming_assignments: Vec<Assignment>,
}

/// 讲师首页
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct LecturerDashboard {
    pub stats: DashboardStats,
    pub pending_requests: i64,
    pub upcoming_assignments: Vec<Assignment>,
}
