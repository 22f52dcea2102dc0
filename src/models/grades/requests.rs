use super::entities::GradeStatus;
use crate::models::common::{PaginationQuery, deserialize_optional_i64};
use serde::Deserialize;
use ts_rs::TS;

fn default_draft() -> GradeStatus {
    GradeStatus::Draft
}

fn default_published() -> GradeStatus {
    GradeStatus::Published
}

/// 单个评分请求；total_marks 缺省取作业满分
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct CreateGradeRequest {
    pub student_id: i64,
    pub assignment_id: i64,
    pub marks_obtained: Option<f64>,
    pub total_marks: Option<f64>,
    pub lecturer_comments: Option<String>,
    #[serde(default = "default_draft")]
    pub status: GradeStatus,
}

/// 快速录入中的一行
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct BulkGradeEntry {
    pub student_id: i64,
    pub marks_obtained: Option<f64>,
    pub lecturer_comments: Option<String>,
}

impl BulkGradeEntry {
    /// 没有正分数的行不保存
    pub fn has_marks(&self) -> bool {
        self.marks_obtained.is_some_and(|m| m > 0.0)
    }
}

/// 快速录入：同一作业的多名学生
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct BulkGradeRequest {
    pub assignment_id: i64,
    #[serde(default = "default_published")]
    pub status: GradeStatus,
    pub entries: Vec<BulkGradeEntry>,
}

/// 修改成绩
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct UpdateGradeRequest {
    pub marks_obtained: Option<f64>,
    pub total_marks: Option<f64>,
    pub lecturer_comments: Option<String>,
}

/// 成绩列表查询参数（HTTP 请求）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct GradeListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[ts(type = "number | null")]
    pub course_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[ts(type = "number | null")]
    pub assignment_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[ts(type = "number | null")]
    pub student_id: Option<i64>,
    pub status: Option<GradeStatus>,
    pub search: Option<String>,
}

// 用于存储层的内部查询参数
#[derive(Debug, Clone, Default)]
pub struct GradeListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub course_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub student_id: Option<i64>,
    pub status: Option<GradeStatus>,
    /// 按作业标题搜索
    pub search: Option<String>,
    /// 仅该讲师所授课程
    pub lecturer_id: Option<i64>,
    /// 隐藏草稿（学生视角）
    pub hide_drafts: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_defaults_to_published() {
        let req: BulkGradeRequest = serde_json::from_str(
            r#"{"assignment_id":3,"entries":[{"student_id":1,"marks_obtained":8},{"student_id":2}]}"#,
        )
        .unwrap();
        assert_eq!(req.status, GradeStatus::Published);
        assert!(req.entries[0].has_marks());
        assert!(!req.entries[1].has_marks());
    }

    #[test]
    fn test_zero_marks_are_skipped() {
        let entry = BulkGradeEntry {
            student_id: 1,
            marks_obtained: Some(0.0),
            lecturer_comments: None,
        };
        assert!(!entry.has_marks());
    }

    #[test]
    fn test_single_grade_defaults_to_draft() {
        let req: CreateGradeRequest =
            serde_json::from_str(r#"{"student_id":1,"assignment_id":2,"marks_obtained":40}"#)
                .unwrap();
        assert_eq!(req.status, GradeStatus::Draft);
        assert_eq!(req.total_marks, None);
    }
}
