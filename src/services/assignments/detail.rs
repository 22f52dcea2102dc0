use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AssignmentService;
use crate::middlewares::RequireJWT;
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

/// 学生需有效选课；讲师需讲授该课程
pub async fn get_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    id: i64,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    let assignment = match storage.get_assignment_by_id(id).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AssignmentNotFound,
                "Assignment not found",
            )));
        }
        Err(e) => {
            return Ok(storage_error_response(
                "Get assignment failed",
                e,
                ErrorCode::AssignmentNotFound,
            ));
        }
    };

    let allowed = match auth_user.role() {
        Some(UserRole::Admin) => Ok(true),
        Some(UserRole::Lecturer) => storage
            .get_course_by_id(assignment.course_id)
            .await
            .map(|c| c.is_some_and(|c| c.is_taught_by(auth_user.id()))),
        Some(UserRole::Student) => storage
            .get_active_enrollment(auth_user.id(), assignment.course_id)
            .await
            .map(|e| e.is_some()),
        None => Ok(false),
    };

    match allowed {
        Ok(true) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            assignment,
            "Assignment retrieved successfully",
        ))),
        Ok(false) => Ok(forbidden_response("You do not have access to this assignment")),
        Err(e) => Ok(storage_error_response(
            "Get assignment failed",
            e,
            ErrorCode::AssignmentNotFound,
        )),
    }
}
