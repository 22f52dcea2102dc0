use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EnrollmentRequestService;
use crate::middlewares::RequireJWT;
use crate::models::enrollments::requests::CreateEnrollmentRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{storage_error_response, unauthorized_response};

const MAX_MESSAGE_LEN: usize = 1000;

pub async fn create_request(
    service: &EnrollmentRequestService,
    request: &HttpRequest,
    create_data: CreateEnrollmentRequest,
) -> ActixResult<HttpResponse> {
    let Some(student_id) = RequireJWT::extract_user_id(request) else {
        return Ok(unauthorized_response());
    };

    if create_data
        .message
        .as_deref()
        .is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN)
    {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            format!("Message cannot exceed {MAX_MESSAGE_LEN} characters"),
        )));
    }

    let storage = service.get_storage(request);
    match storage.create_enrollment_request(student_id, create_data).await {
        Ok(created) => {
            tracing::info!(
                "Student {} requested enrollment in course {}",
                student_id,
                created.course_id
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(
                created,
                "Enrollment request submitted",
            )))
        }
        Err(e) => Ok(storage_error_response(
            "Create enrollment request failed",
            e,
            ErrorCode::EnrollmentRequestDuplicate,
        )),
    }
}
