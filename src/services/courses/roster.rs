//! 课程名单与直接选课
//!
//! 路由挂在 RequireCourseLecturer 之后，只有课程讲师或管理员能访问。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::CourseService;
use crate::middlewares::RequireJWT;
use crate::models::enrollments::{
    requests::EnrollStudentsRequest, responses::EnrollStudentsResponse,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{storage_error_response, unauthorized_response};

pub async fn list_students(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    match storage.list_enrolled_students(course_id).await {
        Ok(students) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            students,
            "Enrolled students retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "List enrolled students failed",
            e,
            ErrorCode::CourseNotFound,
        )),
    }
}

pub async fn list_available_students(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    match storage.list_available_students(course_id).await {
        Ok(students) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            students,
            "Available students retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "List available students failed",
            e,
            ErrorCode::CourseNotFound,
        )),
    }
}

pub async fn enroll_students(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    enroll_data: EnrollStudentsRequest,
) -> ActixResult<HttpResponse> {
    let Some(reviewer_id) = RequireJWT::extract_user_id(request) else {
        return Ok(unauthorized_response());
    };

    let storage = service.get_storage(request);
    match storage
        .enroll_students(course_id, &enroll_data.student_ids, reviewer_id)
        .await
    {
        Ok(enrolled) => {
            tracing::info!(
                "Enrolled {} student(s) into course {}",
                enrolled.len(),
                course_id
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                EnrollStudentsResponse { enrolled },
                "Students enrolled successfully",
            )))
        }
        Err(e) => Ok(storage_error_response(
            "Enroll students failed",
            e,
            ErrorCode::EnrollmentFailed,
        )),
    }
}

// 退课只停用选课记录，成绩保留
pub async fn unenroll_student(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    student_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    match storage.unenroll_student(course_id, student_id).await {
        Ok(enrollment) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            enrollment,
            "Student unenrolled successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "Unenroll student failed",
            e,
            ErrorCode::StudentNotEnrolled,
        )),
    }
}
