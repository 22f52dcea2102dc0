use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::models::auth::{requests::RegisterRequest, responses::SessionResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::storage_error_response;
use crate::utils::password::hash_password;
use crate::utils::validate::{normalize_email, validate_email, validate_password};

use super::AuthService;

pub async fn handle_register(
    service: &AuthService,
    register_request: RegisterRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let email = normalize_email(&register_request.email);

    if let Err(msg) = validate_email(&email) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::RegisterFailed, msg)));
    }
    if let Err(msg) = validate_password(&register_request.password) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::RegisterFailed, msg)));
    }
    if let Some(profile) = &register_request.profile
        && let Err(msg) = profile.validate()
    {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::RegisterFailed, msg)));
    }

    let password_hash = match hash_password(&register_request.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Password hashing failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "Registration failed",
                )),
            );
        }
    };

    let storage = service.get_storage(request);
    match storage
        .create_user(&email, &password_hash, register_request.profile)
        .await
    {
        Ok(auth_user) => {
            tracing::info!("Registered account {}", auth_user.user.email);
            Ok(HttpResponse::Created().json(ApiResponse::success(
                SessionResponse {
                    user: auth_user.user,
                    profile: auth_user.profile,
                },
                "Registration successful",
            )))
        }
        Err(e) => Ok(storage_error_response(
            "Registration failed",
            e,
            ErrorCode::UserAlreadyExists,
        )),
    }
}
