use std::sync::Arc;

use crate::models::{
    announcements::{
        entities::Announcement, requests::CreateAnnouncementRequest,
        responses::AnnouncementListResponse,
    },
    assignments::{
        entities::Assignment,
        requests::{AssignmentListQuery, CreateAssignmentRequest},
        responses::AssignmentListResponse,
    },
    courses::{
        entities::Course,
        requests::{CourseListQuery, CreateCourseRequest, UpdateCourseRequest},
        responses::{CourseListResponse, EnrolledStudent},
    },
    dashboard::responses::DashboardStats,
    enrollments::{
        entities::{Enrollment, EnrollmentRequest},
        requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
        responses::{ApprovalResponse, EnrollmentRequestListResponse},
    },
    feedback::{
        entities::Feedback, requests::FeedbackListQuery, responses::FeedbackListResponse,
    },
    grades::{
        entities::Grade,
        requests::{BulkGradeRequest, CreateGradeRequest, GradeListQuery, UpdateGradeRequest},
        responses::{BulkGradeResponse, GradeListResponse},
    },
    notifications::{
        entities::Notification, requests::NotificationListQuery,
        responses::NotificationListResponse,
    },
    profiles::{
        entities::Profile,
        requests::{CreateProfileRequest, UpdateProfileRequest},
    },
    users::entities::{AuthUser, User},
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 账号
    // 创建账号（可同时建档）
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        profile: Option<CreateProfileRequest>,
    ) -> Result<AuthUser>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 账号 + 资料
    async fn get_auth_user(&self, id: i64) -> Result<Option<AuthUser>>;
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    async fn count_users(&self) -> Result<i64>;

    /// 个人资料
    async fn create_profile(
        &self,
        user_id: i64,
        email: &str,
        profile: CreateProfileRequest,
    ) -> Result<Profile>;
    async fn get_profile(&self, id: i64) -> Result<Option<Profile>>;
    async fn update_profile(&self, id: i64, update: UpdateProfileRequest)
    -> Result<Option<Profile>>;

    /// 课程
    async fn create_course(&self, course: CreateCourseRequest, lecturer_id: i64) -> Result<Course>;
    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>>;
    async fn update_course(
        &self,
        course_id: i64,
        update: UpdateCourseRequest,
    ) -> Result<Option<Course>>;
    async fn list_courses_with_pagination(&self, query: CourseListQuery)
    -> Result<CourseListResponse>;
    // 有效选课学生名单
    async fn list_enrolled_students(&self, course_id: i64) -> Result<Vec<EnrolledStudent>>;
    // 同院系尚未选修的学生
    async fn list_available_students(&self, course_id: i64) -> Result<Vec<Profile>>;

    /// 选课
    // 讲师直接选课（单个或批量），同时批准待审核申请，审核人为 reviewer_id
    async fn enroll_students(
        &self,
        course_id: i64,
        student_ids: &[i64],
        reviewer_id: i64,
    ) -> Result<Vec<Enrollment>>;
    // 退课（改为 inactive）
    async fn unenroll_student(&self, course_id: i64, student_id: i64) -> Result<Enrollment>;
    async fn get_active_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>>;

    /// 选课申请
    async fn create_enrollment_request(
        &self,
        student_id: i64,
        request: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest>;
    async fn get_enrollment_request_by_id(&self, id: i64) -> Result<Option<EnrollmentRequest>>;
    async fn list_enrollment_requests_with_pagination(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse>;
    // 审核通过：申请状态与选课记录在同一事务内写入
    async fn approve_enrollment_request(&self, id: i64, reviewer_id: i64)
    -> Result<ApprovalResponse>;
    async fn reject_enrollment_request(&self, id: i64, reviewer_id: i64)
    -> Result<EnrollmentRequest>;

    /// 作业
    async fn create_assignment(
        &self,
        course_id: i64,
        instructor_id: i64,
        assignment: CreateAssignmentRequest,
    ) -> Result<Assignment>;
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>>;
    async fn list_assignments_with_pagination(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse>;

    /// 成绩
    async fn create_grade(&self, grade: CreateGradeRequest, graded_by: i64) -> Result<Grade>;
    async fn bulk_save_grades(
        &self,
        request: BulkGradeRequest,
        graded_by: i64,
    ) -> Result<BulkGradeResponse>;
    async fn update_grade(&self, id: i64, update: UpdateGradeRequest) -> Result<Grade>;
    async fn publish_grade(&self, id: i64, published_by: i64) -> Result<Grade>;
    async fn get_grade_by_id(&self, id: i64) -> Result<Option<Grade>>;
    async fn list_grades_with_pagination(&self, query: GradeListQuery)
    -> Result<GradeListResponse>;
    // 课程全部成绩（导出用）
    async fn list_course_grades(&self, course_id: i64) -> Result<Vec<Grade>>;
    // 讲师统计；None 表示全部课程
    async fn grade_stats(&self, lecturer_id: Option<i64>) -> Result<DashboardStats>;
    // 学生已发布成绩的平均百分比
    async fn student_average_percentage(&self, student_id: i64) -> Result<Option<f64>>;

    /// 反馈
    async fn create_feedback(
        &self,
        grade: &Grade,
        lecturer_id: i64,
        message: &str,
    ) -> Result<Feedback>;
    async fn list_feedback_with_pagination(
        &self,
        query: FeedbackListQuery,
    ) -> Result<FeedbackListResponse>;
    async fn mark_feedback_read(&self, id: i64, student_id: i64) -> Result<Option<Feedback>>;

    /// 通知
    async fn list_notifications_with_pagination(
        &self,
        user_id: i64,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse>;
    async fn get_unread_notification_count(&self, user_id: i64) -> Result<i64>;
    async fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<Option<Notification>>;
    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<i64>;
    async fn delete_notification(&self, id: i64, user_id: i64) -> Result<bool>;

    /// 公告
    async fn create_announcement(
        &self,
        course_id: i64,
        created_by: i64,
        announcement: CreateAnnouncementRequest,
    ) -> Result<Announcement>;
    async fn get_announcement_by_id(&self, id: i64) -> Result<Option<Announcement>>;
    async fn publish_announcement(&self, id: i64) -> Result<Announcement>;
    async fn list_announcements_with_pagination(
        &self,
        course_id: i64,
        include_drafts: bool,
        page: i64,
        size: i64,
    ) -> Result<AnnouncementListResponse>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
