pub mod announcements;
pub mod assignments;
pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod enrollment_requests;
pub mod feedback;
pub mod grades;
pub mod notifications;

pub use announcements::AnnouncementService;
pub use assignments::AssignmentService;
pub use auth::AuthService;
pub use courses::CourseService;
pub use dashboard::DashboardService;
pub use enrollment_requests::EnrollmentRequestService;
pub use feedback::FeedbackService;
pub use grades::GradeService;
pub use notifications::NotificationService;

use actix_web::HttpResponse;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::CourseHubError;
use crate::models::courses::entities::Course;
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 存储层错误转为响应
///
/// 业务规则冲突返回 4xx 并带上 `code`，其余一律 500。
pub(crate) fn storage_error_response(
    context: &str,
    err: CourseHubError,
    code: ErrorCode,
) -> HttpResponse {
    if !err.is_client_error() {
        error!("{}: {}", context, err);
        return HttpResponse::InternalServerError().json(ApiResponse::error_empty(
            ErrorCode::InternalServerError,
            format!("{context}: internal error"),
        ));
    }
    info!("{}: {}", context, err);
    HttpResponse::build(err.status_code()).json(ApiResponse::error_empty(code, err.message()))
}

pub(crate) fn unauthorized_response() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::error_empty(
        ErrorCode::Unauthorized,
        "Unauthorized access, please login",
    ))
}

pub(crate) fn forbidden_response(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ApiResponse::error_empty(ErrorCode::Forbidden, message))
}

/// 管理员或课程讲师
pub(crate) fn can_manage_course(user: &AuthUser, course: &Course) -> bool {
    user.is_admin() || course.is_taught_by(user.id())
}

/// 加载课程并校验调用者可以管理
pub(crate) async fn load_managed_course(
    storage: &Arc<dyn Storage>,
    user: &AuthUser,
    course_id: i64,
) -> Result<Course, HttpResponse> {
    match storage.get_course_by_id(course_id).await {
        Ok(Some(course)) if can_manage_course(user, &course) => Ok(course),
        Ok(Some(_)) => Err(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::CoursePermissionDenied,
            "You do not teach this course",
        ))),
        Ok(None) => Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::CourseNotFound,
            "Course not found",
        ))),
        Err(e) => Err(storage_error_response(
            "Load course failed",
            e,
            ErrorCode::CourseNotFound,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_rule_violations_map_to_client_errors() {
        let cases = [
            (CourseHubError::not_found("x"), StatusCode::NOT_FOUND),
            (CourseHubError::validation("x"), StatusCode::BAD_REQUEST),
            (CourseHubError::conflict("x"), StatusCode::CONFLICT),
            (CourseHubError::invalid_transition("x"), StatusCode::CONFLICT),
            (CourseHubError::authorization("x"), StatusCode::FORBIDDEN),
            (
                CourseHubError::database_operation("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let resp = storage_error_response("test", err, ErrorCode::BadRequest);
            assert_eq!(resp.status(), status);
        }
    }

    #[actix_web::test]
    async fn test_internal_details_stay_out_of_response() {
        let resp = storage_error_response(
            "Create course failed",
            CourseHubError::database_operation("创建课程失败: disk I/O error"),
            ErrorCode::CourseCreationFailed,
        );
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Create course failed: internal error");
        assert_eq!(json["code"], ErrorCode::InternalServerError as i32);

        let resp = storage_error_response(
            "Create course failed",
            CourseHubError::conflict("Course code already exists"),
            ErrorCode::CourseCreationFailed,
        );
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Course code already exists");
    }
}
