use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::FeedbackService;
use crate::middlewares::RequireJWT;
use crate::models::feedback::requests::{FeedbackListParams, FeedbackListQuery};
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

/// 学生看收到的反馈，讲师看发出的反馈
pub async fn list_feedback(
    service: &FeedbackService,
    request: &HttpRequest,
    query: FeedbackListParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let mut list_query = FeedbackListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        unread_only: query.unread_only.unwrap_or(false),
        ..Default::default()
    };
    match auth_user.role() {
        Some(UserRole::Student) => list_query.student_id = Some(auth_user.id()),
        Some(UserRole::Lecturer) => list_query.lecturer_id = Some(auth_user.id()),
        Some(UserRole::Admin) => {}
        None => return Ok(forbidden_response("Profile required")),
    }

    let storage = service.get_storage(request);
    match storage.list_feedback_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Feedback retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "List feedback failed",
            e,
            ErrorCode::FeedbackNotFound,
        )),
    }
}

pub async fn mark_feedback_read(
    service: &FeedbackService,
    request: &HttpRequest,
    id: i64,
) -> ActixResult<HttpResponse> {
    let Some(student_id) = RequireJWT::extract_user_id(request) else {
        return Ok(unauthorized_response());
    };

    let storage = service.get_storage(request);
    match storage.mark_feedback_read(id, student_id).await {
        Ok(Some(feedback)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            feedback,
            "Feedback marked as read",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::FeedbackNotFound,
            "Feedback not found",
        ))),
        Err(e) => Ok(storage_error_response(
            "Mark feedback read failed",
            e,
            ErrorCode::FeedbackNotFound,
        )),
    }
}
