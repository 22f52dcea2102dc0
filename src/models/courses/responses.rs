use super::entities::Course;
use crate::models::common::PaginationInfo;
use crate::models::enrollments::entities::Enrollment;
use crate::models::profiles::entities::Profile;
use serde::Serialize;
use ts_rs::TS;

// 课程列表项，附带统计
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseListItem {
    #[serde(flatten)]
    #[ts(flatten)]
    pub course: Course,
    pub enrolled_students: i64,
    pub assignment_count: i64,
}

// 课程列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<CourseListItem>,
}

// 课程名单中的学生
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct EnrolledStudent {
    pub enrollment: Enrollment,
    pub student: Profile,
}
