use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::CourseService;
use crate::middlewares::RequireJWT;
use crate::models::courses::requests::CreateCourseRequest;
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

/// 讲师为自己开课；管理员必须指定讲师
pub async fn create_course(
    service: &CourseService,
    request: &HttpRequest,
    course_data: CreateCourseRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    if let Err(msg) = course_data.validate() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::CourseCreationFailed, msg)));
    }

    let storage = service.get_storage(request);

    let lecturer_id = match (auth_user.role(), course_data.lecturer_id) {
        (Some(UserRole::Lecturer), None) => auth_user.id(),
        (Some(UserRole::Lecturer), Some(id)) if id == auth_user.id() => id,
        (Some(UserRole::Lecturer), Some(_)) => {
            return Ok(forbidden_response("Lecturers can only create their own courses"));
        }
        (Some(UserRole::Admin), Some(id)) => {
            // 指定的讲师必须存在
            match storage.get_profile(id).await {
                Ok(Some(profile)) if profile.role == UserRole::Lecturer => id,
                Ok(_) => {
                    return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                        ErrorCode::CourseCreationFailed,
                        format!("User {id} is not a lecturer"),
                    )));
                }
                Err(e) => {
                    return Ok(storage_error_response(
                        "Create course failed",
                        e,
                        ErrorCode::CourseCreationFailed,
                    ));
                }
            }
        }
        (Some(UserRole::Admin), None) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::CourseCreationFailed,
                "lecturer_id is required when an admin creates a course",
            )));
        }
        _ => return Ok(forbidden_response("Only lecturers can create courses")),
    };

    match storage.create_course(course_data, lecturer_id).await {
        Ok(course) => Ok(HttpResponse::Created()
            .json(ApiResponse::success(course, "Course created successfully"))),
        Err(e) => Ok(storage_error_response(
            "Create course failed",
            e,
            ErrorCode::CourseCodeExists,
        )),
    }
}
