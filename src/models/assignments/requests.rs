use super::entities::AssignmentType;
use crate::models::common::{PaginationQuery, deserialize_optional_i64};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use ts_rs::TS;

/// 创建作业请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_assignment_type")]
    pub assignment_type: AssignmentType,
    pub max_points: Option<f64>,
    pub due_date: DateTime<Utc>, // ISO 8601 格式，如 "2026-01-24T12:00:00Z"
}

fn default_assignment_type() -> AssignmentType {
    AssignmentType::Assignment
}

/// 作业列表查询参数（HTTP 请求）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct AssignmentListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[ts(type = "number | null")]
    pub course_id: Option<i64>,
    pub assignment_type: Option<AssignmentType>,
    pub search: Option<String>,
}

// 用于存储层的内部查询参数
#[derive(Debug, Clone, Default)]
pub struct AssignmentListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub course_id: Option<i64>,
    pub assignment_type: Option<AssignmentType>,
    pub search: Option<String>,
    /// 仅该学生有效选修课程的作业
    pub enrolled_student_id: Option<i64>,
    /// 仅该讲师所授课程的作业
    pub lecturer_id: Option<i64>,
    /// 仅截止时间晚于此刻的作业（按截止时间升序）
    pub due_after: Option<i64>,
}
