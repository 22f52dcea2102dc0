use super::entities::EnrollmentRequestStatus;
use crate::models::common::{PaginationQuery, deserialize_optional_i64};
use serde::Deserialize;
use ts_rs::TS;

// 讲师直接选课（单个或批量）
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollStudentsRequest {
    pub student_ids: Vec<i64>,
}

// 学生提交选课申请
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct CreateEnrollmentRequest {
    pub course_id: i64,
    pub message: Option<String>,
}

// 选课申请查询参数（来自HTTP请求）
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollmentRequestQueryParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[ts(type = "number | null")]
    pub course_id: Option<i64>,
    pub status: Option<EnrollmentRequestStatus>,
}

// 选课申请列表查询（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct EnrollmentRequestListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub course_id: Option<i64>,
    pub status: Option<EnrollmentRequestStatus>,
    /// 学生本人的申请
    pub student_id: Option<i64>,
    /// 该讲师所授课程的申请
    pub lecturer_id: Option<i64>,
}
