use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::middlewares::RequireJWT;
use crate::models::profiles::entities::UserRole;
use crate::models::profiles::requests::{CreateProfileRequest, UpdateProfileRequest};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

use super::AuthService;

pub async fn handle_create_profile(
    service: &AuthService,
    profile_request: CreateProfileRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    if let Err(msg) = profile_request.validate() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }

    let storage = service.get_storage(request);
    match storage
        .create_profile(auth_user.id(), &auth_user.user.email, profile_request)
        .await
    {
        Ok(profile) => {
            service.invalidate_session(request).await;
            Ok(HttpResponse::Created().json(ApiResponse::success(profile, "Profile created")))
        }
        Err(e) => Ok(storage_error_response(
            "Create profile failed",
            e,
            ErrorCode::ProfileAlreadyExists,
        )),
    }
}

pub async fn handle_update_profile(
    service: &AuthService,
    update_request: UpdateProfileRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user_id) = RequireJWT::extract_user_id(request) else {
        return Ok(unauthorized_response());
    };

    if update_request
        .full_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ProfileUpdateFailed,
            "Full name cannot be empty",
        )));
    }

    let storage = service.get_storage(request);
    match storage.update_profile(user_id, update_request).await {
        Ok(Some(profile)) => {
            service.invalidate_session(request).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success(profile, "Profile updated")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::ProfileNotFound,
            "Profile not found, create it first",
        ))),
        Err(e) => Ok(storage_error_response(
            "Update profile failed",
            e,
            ErrorCode::ProfileUpdateFailed,
        )),
    }
}

/// 学生只能查看本人或讲师的资料
pub async fn handle_get_profile(
    service: &AuthService,
    profile_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let storage = service.get_storage(request);
    match storage.get_profile(profile_id).await {
        Ok(Some(profile)) => {
            let visible = profile.id == auth_user.id()
                || matches!(auth_user.role(), Some(UserRole::Lecturer | UserRole::Admin))
                || profile.role != UserRole::Student;
            if !visible {
                return Ok(forbidden_response("You cannot view this profile"));
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(profile, "Profile retrieved")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::ProfileNotFound,
            "Profile not found",
        ))),
        Err(e) => Ok(storage_error_response(
            "Get profile failed",
            e,
            ErrorCode::ProfileNotFound,
        )),
    }
}
