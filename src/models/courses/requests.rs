use super::entities::CourseScope;
use crate::models::common::PaginationQuery;
use serde::Deserialize;
use ts_rs::TS;

// 课程查询参数（来自HTTP请求）
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseQueryParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub search: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub scope: CourseScope,
}

// 创建课程请求
//
// lecturer_id 不填时为当前讲师；管理员创建时必须指定
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CreateCourseRequest {
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub department: String,
    pub credits: Option<i32>,
    pub semester: Option<String>,
    pub academic_year: Option<String>,
    pub lecturer_id: Option<i64>,
}

// 更新课程请求
#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct UpdateCourseRequest {
    pub course_name: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub credits: Option<i32>,
    pub semester: Option<String>,
    pub academic_year: Option<String>,
}

// 课程列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct CourseListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub search: Option<String>,
    pub department: Option<String>,
    /// 限定讲师
    pub lecturer_id: Option<i64>,
    /// 限定该学生有效选修的课程
    pub enrolled_student_id: Option<i64>,
    /// 排除该学生有效选修的课程
    pub exclude_student_id: Option<i64>,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.course_code.trim().is_empty() {
            return Err("Course code is required");
        }
        if self.course_name.trim().is_empty() {
            return Err("Course name is required");
        }
        if self.department.trim().is_empty() {
            return Err("Department is required");
        }
        if self.credits.is_some_and(|c| c <= 0) {
            return Err("Credits must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_course_validation() {
        let mut req: CreateCourseRequest = serde_json::from_str(
            r#"{"course_code":"CS101","course_name":"Intro","department":"Computing"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());

        req.credits = Some(0);
        assert_eq!(req.validate().unwrap_err(), "Credits must be positive");

        req.credits = None;
        req.department = " ".to_string();
        assert_eq!(req.validate().unwrap_err(), "Department is required");
    }

    #[test]
    fn test_scope_defaults_to_mine() {
        let params: CourseQueryParams = serde_json::from_str(r#"{"page":1,"size":5}"#).unwrap();
        assert_eq!(params.scope, CourseScope::Mine);
    }
}
