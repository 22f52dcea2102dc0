use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{GradeService, grade_error_response};
use crate::middlewares::RequireJWT;
use crate::models::assignments::entities::Assignment;
use crate::models::grades::requests::{BulkGradeRequest, CreateGradeRequest};
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{load_managed_course, storage_error_response, unauthorized_response};
use crate::storage::Storage;

/// 作业存在且调用者讲授其课程
async fn load_gradable_assignment(
    storage: &Arc<dyn Storage>,
    auth_user: &AuthUser,
    assignment_id: i64,
) -> Result<Assignment, HttpResponse> {
    let assignment = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            return Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AssignmentNotFound,
                "Assignment not found",
            )));
        }
        Err(e) => {
            return Err(storage_error_response(
                "Load assignment failed",
                e,
                ErrorCode::AssignmentNotFound,
            ));
        }
    };
    load_managed_course(storage, auth_user, assignment.course_id).await?;
    Ok(assignment)
}

pub async fn create_grade(
    service: &GradeService,
    request: &HttpRequest,
    grade_data: CreateGradeRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    if let Err(resp) = load_gradable_assignment(&storage, &auth_user, grade_data.assignment_id).await
    {
        return Ok(resp);
    }

    match storage.create_grade(grade_data, auth_user.id()).await {
        Ok(grade) => {
            tracing::info!(
                "Grade {} saved as {} by {}",
                grade.id,
                grade.status,
                auth_user.id()
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(grade, "Grade saved")))
        }
        Err(e) => Ok(grade_error_response("Create grade failed", e)),
    }
}

/// 整批在一个事务内写入
pub async fn bulk_save_grades(
    service: &GradeService,
    request: &HttpRequest,
    bulk_data: BulkGradeRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    if bulk_data.entries.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "No grade entries provided",
        )));
    }
    let storage = service.get_storage(request);

    if let Err(resp) = load_gradable_assignment(&storage, &auth_user, bulk_data.assignment_id).await
    {
        return Ok(resp);
    }

    match storage.bulk_save_grades(bulk_data, auth_user.id()).await {
        Ok(result) => {
            tracing::info!(
                "Bulk grading saved {} and skipped {} entries",
                result.saved.len(),
                result.skipped.len()
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(result, "Grades saved")))
        }
        Err(e) => Ok(grade_error_response("Bulk grading failed", e)),
    }
}
