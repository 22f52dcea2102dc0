use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EnrollmentRequestService;
use crate::middlewares::RequireJWT;
use crate::models::enrollments::requests::{
    EnrollmentRequestListQuery, EnrollmentRequestQueryParams,
};
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

/// 学生看自己的申请，讲师看所授课程的申请，管理员看全部
pub async fn list_requests(
    service: &EnrollmentRequestService,
    request: &HttpRequest,
    query: EnrollmentRequestQueryParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let mut list_query = EnrollmentRequestListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        course_id: query.course_id,
        status: query.status,
        ..Default::default()
    };
    match auth_user.role() {
        Some(UserRole::Student) => list_query.student_id = Some(auth_user.id()),
        Some(UserRole::Lecturer) => list_query.lecturer_id = Some(auth_user.id()),
        Some(UserRole::Admin) => {}
        None => return Ok(forbidden_response("Profile required")),
    }

    let storage = service.get_storage(request);
    match storage
        .list_enrollment_requests_with_pagination(list_query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Enrollment requests retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "List enrollment requests failed",
            e,
            ErrorCode::EnrollmentRequestNotFound,
        )),
    }
}
