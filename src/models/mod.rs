pub mod announcements;
pub mod assignments;
pub mod auth;
pub mod common;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod feedback;
pub mod grades;
pub mod notifications;
pub mod profiles;
pub mod users;

pub use common::{ApiResponse, PaginationInfo, PaginationQuery};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 业务错误码（响应体 code 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub enum ErrorCode {
    // 通用
    Success = 0,
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    InternalServerError = 1500,
    RateLimitExceeded = 1429,

    // 认证
    AuthFailed = 2000,
    RegisterFailed = 2001,
    UserAlreadyExists = 2002,
    UserNotFound = 2003,
    AccountSuspended = 2004,

    // 个人资料
    ProfileNotFound = 2100,
    ProfileAlreadyExists = 2101,
    ProfileUpdateFailed = 2102,

    // 课程
    CourseNotFound = 3000,
    CourseCodeExists = 3001,
    CourseCreationFailed = 3002,
    CourseUpdateFailed = 3003,
    CoursePermissionDenied = 3004,

    // 选课
    EnrollmentFailed = 3100,
    EnrollmentRequestNotFound = 3101,
    EnrollmentRequestDuplicate = 3102,
    EnrollmentRequestAlreadyReviewed = 3103,
    StudentNotEnrolled = 3104,

    // 作业
    AssignmentNotFound = 4000,
    AssignmentCreationFailed = 4001,

    // 成绩
    GradeNotFound = 5000,
    GradeInvalidMarks = 5001,
    GradeInvalidTransition = 5002,
    GradeAlreadyExists = 5003,
    GradeExportFailed = 5004,

    // 反馈
    FeedbackNotFound = 6000,
    FeedbackCreationFailed = 6001,

    // 通知
    NotificationNotFound = 7000,

    // 公告
    AnnouncementNotFound = 8000,
    AnnouncementCreationFailed = 8001,
}
