use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AssignmentService;
use crate::middlewares::RequireJWT;
use crate::models::assignments::requests::{AssignmentListParams, AssignmentListQuery};
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

pub async fn list_assignments(
    service: &AssignmentService,
    request: &HttpRequest,
    query: AssignmentListParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let mut list_query = AssignmentListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        course_id: query.course_id,
        assignment_type: query.assignment_type,
        search: query.search,
        ..Default::default()
    };
    match auth_user.role() {
        Some(UserRole::Student) => list_query.enrolled_student_id = Some(auth_user.id()),
        Some(UserRole::Lecturer) => list_query.lecturer_id = Some(auth_user.id()),
        Some(UserRole::Admin) => {}
        None => return Ok(forbidden_response("Profile required")),
    }

    let storage = service.get_storage(request);
    match storage.list_assignments_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Assignment list retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "List assignments failed",
            e,
            ErrorCode::AssignmentNotFound,
        )),
    }
}
