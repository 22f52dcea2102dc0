use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{GradeService, grade_error_response};
use crate::middlewares::RequireJWT;
use crate::models::grades::entities::Grade;
use crate::models::grades::requests::UpdateGradeRequest;
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{load_managed_course, unauthorized_response};
use crate::storage::Storage;

async fn load_managed_grade(
    storage: &Arc<dyn Storage>,
    auth_user: &AuthUser,
    id: i64,
) -> Result<Grade, HttpResponse> {
    let grade = match storage.get_grade_by_id(id).await {
        Ok(Some(g)) => g,
        Ok(None) => {
            return Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::GradeNotFound,
                "Grade not found",
            )));
        }
        Err(e) => return Err(grade_error_response("Load grade failed", e)),
    };
    load_managed_course(storage, auth_user, grade.course_id).await?;
    Ok(grade)
}

/// 已发布的成绩修改后变为 revised 并通知学生
pub async fn update_grade(
    service: &GradeService,
    request: &HttpRequest,
    id: i64,
    update_data: UpdateGradeRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    if let Err(resp) = load_managed_grade(&storage, &auth_user, id).await {
        return Ok(resp);
    }

    match storage.update_grade(id, update_data).await {
        Ok(grade) => Ok(HttpResponse::Ok().json(ApiResponse::success(grade, "Grade updated"))),
        Err(e) => Ok(grade_error_response("Update grade failed", e)),
    }
}

pub async fn publish_grade(
    service: &GradeService,
    request: &HttpRequest,
    id: i64,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    if let Err(resp) = load_managed_grade(&storage, &auth_user, id).await {
        return Ok(resp);
    }

    match storage.publish_grade(id, auth_user.id()).await {
        Ok(grade) => {
            tracing::info!("Grade {} published by {}", id, auth_user.id());
            Ok(HttpResponse::Ok().json(ApiResponse::success(grade, "Grade published")))
        }
        Err(e) => Ok(grade_error_response("Publish grade failed", e)),
    }
}
