use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 课程
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct Course {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub lecturer_id: Option<i64>,
    pub department: String,
    pub credits: i32,
    pub semester: Option<String>,
    pub academic_year: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Course {
    /// 是否由该用户讲授
    pub fn is_taught_by(&self, profile_id: i64) -> bool {
        self.lecturer_id == Some(profile_id)
    }
}

/// 课程列表范围
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub enum CourseScope {
    /// 讲师：自己讲授的课程；学生：已选课程；管理员：全部
    #[default]
    Mine,
    /// 学生：本院系尚未选修的课程
    Available,
}
