use super::entities::Grade;
use crate::models::common::PaginationInfo;
use serde::Serialize;
use ts_rs::TS;

/// 成绩列表项，附学生姓名与作业标题
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct GradeListItem {
    #[serde(flatten)]
    #[ts(flatten)]
    pub grade: Grade,
    pub student_name: Option<String>,
    pub assignment_title: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct GradeListResponse {
    pub items: Vec<GradeListItem>,
    pub pagination: PaginationInfo,
}

/// 快速录入结果
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct BulkGradeResponse {
    pub saved: Vec<Grade>,
    /// 未保存的学生（没有分数）
    pub skipped: Vec<i64>,
}
