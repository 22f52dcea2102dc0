use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::FeedbackService;
use crate::middlewares::RequireJWT;
use crate::models::feedback::requests::CreateFeedbackRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{load_managed_course, storage_error_response, unauthorized_response};

const MAX_MESSAGE_LEN: usize = 2000;

/// 只能对已发布（或修订过）的成绩发送反馈
pub async fn create_feedback(
    service: &FeedbackService,
    request: &HttpRequest,
    feedback_data: CreateFeedbackRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let message = feedback_data.message.trim();
    if message.is_empty() || message.chars().count() > MAX_MESSAGE_LEN {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::FeedbackCreationFailed,
            format!("Feedback message must be 1 to {MAX_MESSAGE_LEN} characters"),
        )));
    }

    let storage = service.get_storage(request);
    let grade = match storage.get_grade_by_id(feedback_data.grade_id).await {
        Ok(Some(g)) => g,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::GradeNotFound,
                "Grade not found",
            )));
        }
        Err(e) => {
            return Ok(storage_error_response(
                "Load grade failed",
                e,
                ErrorCode::GradeNotFound,
            ));
        }
    };

    if let Err(resp) = load_managed_course(&storage, &auth_user, grade.course_id).await {
        return Ok(resp);
    }
    if !grade.status.is_visible_to_student() {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::FeedbackCreationFailed,
            "Feedback can only be sent on a published grade",
        )));
    }

    match storage.create_feedback(&grade, auth_user.id(), message).await {
        Ok(feedback) => Ok(HttpResponse::Created().json(ApiResponse::success(
            feedback,
            "Feedback sent",
        ))),
        Err(e) => Ok(storage_error_response(
            "Create feedback failed",
            e,
            ErrorCode::FeedbackCreationFailed,
        )),
    }
}
