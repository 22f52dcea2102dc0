//! 审核选课申请
//!
//! 只有课程讲师或管理员可以审核；通过时申请状态与选课记录在同一事务中写入。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EnrollmentRequestService;
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{load_managed_course, storage_error_response, unauthorized_response};

pub async fn review_request(
    service: &EnrollmentRequestService,
    request: &HttpRequest,
    id: i64,
    approve: bool,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    let enrollment_request = match storage.get_enrollment_request_by_id(id).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::EnrollmentRequestNotFound,
                "Enrollment request not found",
            )));
        }
        Err(e) => {
            return Ok(storage_error_response(
                "Load enrollment request failed",
                e,
                ErrorCode::EnrollmentRequestNotFound,
            ));
        }
    };

    if let Err(resp) =
        load_managed_course(&storage, &auth_user, enrollment_request.course_id).await
    {
        return Ok(resp);
    }

    if approve {
        match storage.approve_enrollment_request(id, auth_user.id()).await {
            Ok(approval) => {
                tracing::info!(
                    "Enrollment request {} approved by {}",
                    id,
                    auth_user.id()
                );
                Ok(HttpResponse::Ok().json(ApiResponse::success(
                    approval,
                    "Enrollment request approved",
                )))
            }
            Err(e) => Ok(storage_error_response(
                "Approve enrollment request failed",
                e,
                ErrorCode::EnrollmentRequestAlreadyReviewed,
            )),
        }
    } else {
        match storage.reject_enrollment_request(id, auth_user.id()).await {
            Ok(rejected) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                rejected,
                "Enrollment request rejected",
            ))),
            Err(e) => Ok(storage_error_response(
                "Reject enrollment request failed",
                e,
                ErrorCode::EnrollmentRequestAlreadyReviewed,
            )),
        }
    }
}
