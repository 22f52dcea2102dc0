//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。
//! 多步写操作（审核、直接选课、批量评分）在单个事务内完成，
//! 提交成功后再向实时通道发布变更事件。

mod announcements;
mod assignments;
mod courses;
mod enrollment_requests;
mod enrollments;
mod feedback;
mod grades;
mod notifications;
mod profiles;
mod users;

use crate::config::AppConfig;
use crate::errors::{CourseHubError, Result};
use crate::realtime::ChangeHub;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
    pub(crate) changes: Arc<ChangeHub>,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        let storage = Self::from_connection(db, ChangeHub::shared()).await?;
        info!("SeaORM 存储初始化完成，数据库: {}", db_url);
        Ok(storage)
    }

    /// 基于已有连接创建（执行迁移）
    pub async fn from_connection(db: DatabaseConnection, changes: Arc<ChangeHub>) -> Result<Self> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self { db, changes })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| CourseHubError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| CourseHubError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false);

        Database::connect(opt)
            .await
            .map_err(|e| CourseHubError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(CourseHubError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

/// 规范化分页参数，返回 (page, size)
pub(crate) fn page_and_size(page: Option<i64>, size: Option<i64>) -> (u64, u64) {
    (
        page.unwrap_or(1).max(1) as u64,
        size.unwrap_or(10).clamp(1, 100) as u64,
    )
}

// Storage trait 实现
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
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 账号模块
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        profile: Option<CreateProfileRequest>,
    ) -> Result<AuthUser> {
        self.create_user_impl(email, password_hash, profile).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_auth_user(&self, id: i64) -> Result<Option<AuthUser>> {
        self.get_auth_user_impl(id).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn count_users(&self) -> Result<i64> {
        self.count_users_impl().await
    }

    // 资料模块
    async fn create_profile(
        &self,
        user_id: i64,
        email: &str,
        profile: CreateProfileRequest,
    ) -> Result<Profile> {
        self.create_profile_impl(user_id, email, profile).await
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        self.get_profile_impl(id).await
    }

    async fn update_profile(
        &self,
        id: i64,
        update: UpdateProfileRequest,
    ) -> Result<Option<Profile>> {
        self.update_profile_impl(id, update).await
    }

    // 课程模块
    async fn create_course(&self, course: CreateCourseRequest, lecturer_id: i64) -> Result<Course> {
        self.create_course_impl(course, lecturer_id).await
    }

    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>> {
        self.get_course_by_id_impl(course_id).await
    }

    async fn update_course(
        &self,
        course_id: i64,
        update: UpdateCourseRequest,
    ) -> Result<Option<Course>> {
        self.update_course_impl(course_id, update).await
    }

    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        self.list_courses_with_pagination_impl(query).await
    }

    async fn list_enrolled_students(&self, course_id: i64) -> Result<Vec<EnrolledStudent>> {
        self.list_enrolled_students_impl(course_id).await
    }

    async fn list_available_students(&self, course_id: i64) -> Result<Vec<Profile>> {
        self.list_available_students_impl(course_id).await
    }

    // 选课模块
    async fn enroll_students(
        &self,
        course_id: i64,
        student_ids: &[i64],
        reviewer_id: i64,
    ) -> Result<Vec<Enrollment>> {
        self.enroll_students_impl(course_id, student_ids, reviewer_id)
            .await
    }

    async fn unenroll_student(&self, course_id: i64, student_id: i64) -> Result<Enrollment> {
        self.unenroll_student_impl(course_id, student_id).await
    }

    async fn get_active_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>> {
        self.get_active_enrollment_impl(student_id, course_id).await
    }

    // 选课申请模块
    async fn create_enrollment_request(
        &self,
        student_id: i64,
        request: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest> {
        self.create_enrollment_request_impl(student_id, request)
            .await
    }

    async fn get_enrollment_request_by_id(&self, id: i64) -> Result<Option<EnrollmentRequest>> {
        self.get_enrollment_request_by_id_impl(id).await
    }

    async fn list_enrollment_requests_with_pagination(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse> {
        self.list_enrollment_requests_with_pagination_impl(query)
            .await
    }

    async fn approve_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
    ) -> Result<ApprovalResponse> {
        self.approve_enrollment_request_impl(id, reviewer_id).await
    }

    async fn reject_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
    ) -> Result<EnrollmentRequest> {
        self.reject_enrollment_request_impl(id, reviewer_id).await
    }

    // 作业模块
    async fn create_assignment(
        &self,
        course_id: i64,
        instructor_id: i64,
        assignment: CreateAssignmentRequest,
    ) -> Result<Assignment> {
        self.create_assignment_impl(course_id, instructor_id, assignment)
            .await
    }

    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(id).await
    }

    async fn list_assignments_with_pagination(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse> {
        self.list_assignments_with_pagination_impl(query).await
    }

    // 成绩模块
    async fn create_grade(&self, grade: CreateGradeRequest, graded_by: i64) -> Result<Grade> {
        self.create_grade_impl(grade, graded_by).await
    }

    async fn bulk_save_grades(
        &self,
        request: BulkGradeRequest,
        graded_by: i64,
    ) -> Result<BulkGradeResponse> {
        self.bulk_save_grades_impl(request, graded_by).await
    }

    async fn update_grade(&self, id: i64, update: UpdateGradeRequest) -> Result<Grade> {
        self.update_grade_impl(id, update).await
    }

    async fn publish_grade(&self, id: i64, published_by: i64) -> Result<Grade> {
        self.publish_grade_impl(id, published_by).await
    }

    async fn get_grade_by_id(&self, id: i64) -> Result<Option<Grade>> {
        self.get_grade_by_id_impl(id).await
    }

    async fn list_grades_with_pagination(
        &self,
        query: GradeListQuery,
    ) -> Result<GradeListResponse> {
        self.list_grades_with_pagination_impl(query).await
    }

    async fn list_course_grades(&self, course_id: i64) -> Result<Vec<Grade>> {
        self.list_course_grades_impl(course_id).await
    }

    async fn grade_stats(&self, lecturer_id: Option<i64>) -> Result<DashboardStats> {
        self.grade_stats_impl(lecturer_id).await
    }

    async fn student_average_percentage(&self, student_id: i64) -> Result<Option<f64>> {
        self.student_average_percentage_impl(student_id).await
    }

    // 反馈模块
    async fn create_feedback(
        &self,
        grade: &Grade,
        lecturer_id: i64,
        message: &str,
    ) -> Result<Feedback> {
        self.create_feedback_impl(grade, lecturer_id, message).await
    }

    async fn list_feedback_with_pagination(
        &self,
        query: FeedbackListQuery,
    ) -> Result<FeedbackListResponse> {
        self.list_feedback_with_pagination_impl(query).await
    }

    async fn mark_feedback_read(&self, id: i64, student_id: i64) -> Result<Option<Feedback>> {
        self.mark_feedback_read_impl(id, student_id).await
    }

    // 通知模块
    async fn list_notifications_with_pagination(
        &self,
        user_id: i64,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse> {
        self.list_notifications_with_pagination_impl(user_id, query)
            .await
    }

    async fn get_unread_notification_count(&self, user_id: i64) -> Result<i64> {
        self.get_unread_notification_count_impl(user_id).await
    }

    async fn mark_notification_read(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Notification>> {
        self.mark_notification_read_impl(id, user_id).await
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<i64> {
        self.mark_all_notifications_read_impl(user_id).await
    }

    async fn delete_notification(&self, id: i64, user_id: i64) -> Result<bool> {
        self.delete_notification_impl(id, user_id).await
    }

    // 公告模块
    async fn create_announcement(
        &self,
        course_id: i64,
        created_by: i64,
        announcement: CreateAnnouncementRequest,
    ) -> Result<Announcement> {
        self.create_announcement_impl(course_id, created_by, announcement)
            .await
    }

    async fn get_announcement_by_id(&self, id: i64) -> Result<Option<Announcement>> {
        self.get_announcement_by_id_impl(id).await
    }

    async fn publish_announcement(&self, id: i64) -> Result<Announcement> {
        self.publish_announcement_impl(id).await
    }

    async fn list_announcements_with_pagination(
        &self,
        course_id: i64,
        include_drafts: bool,
        page: i64,
        size: i64,
    ) -> Result<AnnouncementListResponse> {
        self.list_announcements_with_pagination_impl(
            course_id,
            include_drafts,
            Some(page),
            Some(size),
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 内存 SQLite 测试夹具

    use super::SeaOrmStorage;
    use crate::models::{
        assignments::{
            entities::{Assignment, AssignmentType},
            requests::CreateAssignmentRequest,
        },
        courses::{entities::Course, requests::CreateCourseRequest},
        profiles::{entities::UserRole, requests::CreateProfileRequest},
        users::entities::AuthUser,
    };
    use crate::realtime::ChangeHub;
    use sea_orm::{ConnectOptions, Database};
    use std::sync::Arc;

    pub async fn storage() -> SeaOrmStorage {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        SeaOrmStorage::from_connection(db, Arc::new(ChangeHub::new(64)))
            .await
            .unwrap()
    }

    pub fn profile(name: &str, role: UserRole, department: &str) -> CreateProfileRequest {
        CreateProfileRequest {
            full_name: name.to_string(),
            role,
            student_id: (role == UserRole::Student).then(|| format!("S-{name}")),
            lecturer_id: (role == UserRole::Lecturer).then(|| format!("L-{name}")),
            department: Some(department.to_string()),
            year_of_study: None,
            avatar_url: None,
        }
    }

    pub async fn user(storage: &SeaOrmStorage, name: &str, role: UserRole) -> AuthUser {
        storage
            .create_user_impl(
                &format!("{}@uni.edu", name.to_lowercase()),
                "hash",
                Some(profile(name, role, "Computing")),
            )
            .await
            .unwrap()
    }

    pub async fn course(storage: &SeaOrmStorage, code: &str, lecturer_id: i64) -> Course {
        storage
            .create_course_impl(
                CreateCourseRequest {
                    course_code: code.to_string(),
                    course_name: format!("{code} course"),
                    description: None,
                    department: "Computing".to_string(),
                    credits: None,
                    semester: None,
                    academic_year: None,
                    lecturer_id: None,
                },
                lecturer_id,
            )
            .await
            .unwrap()
    }

    pub async fn assignment(
        storage: &SeaOrmStorage,
        course_id: i64,
        lecturer_id: i64,
        title: &str,
        max_points: f64,
    ) -> Assignment {
        storage
            .create_assignment_impl(
                course_id,
                lecturer_id,
                CreateAssignmentRequest {
                    title: title.to_string(),
                    description: None,
                    assignment_type: AssignmentType::Test,
                    max_points: Some(max_points),
                    due_date: chrono::Utc::now() + chrono::Duration::days(7),
                },
            )
            .await
            .unwrap()
    }
}
