//! 首页统计
//!
//! 学生：选课数、未读通知、平均百分比、最近成绩、即将截止的作业。
//! 讲师：所授课程统计、待审核申请数、即将截止的作业；管理员统计全部课程。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::DashboardService;
use crate::errors::Result;
use crate::middlewares::RequireJWT;
use crate::models::assignments::requests::AssignmentListQuery;
use crate::models::courses::requests::CourseListQuery;
use crate::models::dashboard::responses::{LecturerDashboard, StudentDashboard};
use crate::models::enrollments::entities::EnrollmentRequestStatus;
use crate::models::enrollments::requests::EnrollmentRequestListQuery;
use crate::models::grades::requests::GradeListQuery;
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};
use crate::storage::Storage;

const RECENT_LIMIT: i64 = 5;

pub async fn get_dashboard(
    service: &DashboardService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);
    let now = chrono::Utc::now().timestamp();

    match auth_user.role() {
        Some(UserRole::Student) => match student_dashboard(&storage, auth_user.id(), now).await {
            Ok(dashboard) => Ok(HttpResponse::Ok()
                .json(ApiResponse::success(dashboard, "Dashboard retrieved"))),
            Err(e) => Ok(storage_error_response(
                "Load dashboard failed",
                e,
                ErrorCode::InternalServerError,
            )),
        },
        Some(role) => {
            let lecturer_id = (role == UserRole::Lecturer).then(|| auth_user.id());
            match lecturer_dashboard(&storage, lecturer_id, now).await {
                Ok(dashboard) => Ok(HttpResponse::Ok()
                    .json(ApiResponse::success(dashboard, "Dashboard retrieved"))),
                Err(e) => Ok(storage_error_response(
                    "Load dashboard failed",
                    e,
                    ErrorCode::InternalServerError,
                )),
            }
        }
        None => Ok(forbidden_response("Profile required")),
    }
}

async fn student_dashboard(
    storage: &Arc<dyn Storage>,
    student_id: i64,
    now: i64,
) -> Result<StudentDashboard> {
    let (courses, unread, average, grades, upcoming) = tokio::try_join!(
        storage.list_courses_with_pagination(CourseListQuery {
            page: Some(1),
            size: Some(1),
            enrolled_student_id: Some(student_id),
            ..Default::default()
        }),
        storage.get_unread_notification_count(student_id),
        storage.student_average_percentage(student_id),
        storage.list_grades_with_pagination(GradeListQuery {
            page: Some(1),
            size: Some(RECENT_LIMIT),
            student_id: Some(student_id),
            hide_drafts: true,
            ..Default::default()
        }),
        storage.list_assignments_with_pagination(AssignmentListQuery {
            page: Some(1),
            size: Some(RECENT_LIMIT),
            enrolled_student_id: Some(student_id),
            due_after: Some(now),
            ..Default::default()
        }),
    )?;

    Ok(StudentDashboard {
        enrolled_courses: courses.pagination.total,
        unread_notifications: unread,
        average_percentage: average,
        recent_grades: grades.items,
        upcoming_assignments: upcoming.items,
    })
}

/// `lecturer_id` 为空时统计全部课程
async fn lecturer_dashboard(
    storage: &Arc<dyn Storage>,
    lecturer_id: Option<i64>,
    now: i64,
) -> Result<LecturerDashboard> {
    let (stats, pending, upcoming) = tokio::try_join!(
        storage.grade_stats(lecturer_id),
        storage.list_enrollment_requests_with_pagination(EnrollmentRequestListQuery {
            page: Some(1),
            size: Some(1),
            status: Some(EnrollmentRequestStatus::Pending),
            lecturer_id,
            ..Default::default()
        }),
        storage.list_assignments_with_pagination(AssignmentListQuery {
            page: Some(1),
            size: Some(RECENT_LIMIT),
            lecturer_id,
            due_after: Some(now),
            ..Default::default()
        }),
    )?;

    Ok(LecturerDashboard {
        stats,
        pending_requests: pending.pagination.total,
        upcoming_assignments: upcoming.items,
    })
}
