use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AnnouncementService;
use crate::middlewares::RequireJWT;
use crate::models::announcements::requests::AnnouncementListParams;
use crate::models::profiles::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{
    can_manage_course, forbidden_response, storage_error_response, unauthorized_response,
};

/// 课程讲师能看到草稿；学生需有效选课，只看已发布
pub async fn list_announcements(
    service: &AnnouncementService,
    request: &HttpRequest,
    course_id: i64,
    query: AnnouncementListParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    let course = match storage.get_course_by_id(course_id).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::CourseNotFound,
                "Course not found",
            )));
        }
        Err(e) => {
            return Ok(storage_error_response(
                "Load course failed",
                e,
                ErrorCode::CourseNotFound,
            ));
        }
    };

    let include_drafts = can_manage_course(&auth_user, &course);
    if !include_drafts {
        let is_member = match auth_user.role() {
            Some(UserRole::Student) => {
                match storage.get_active_enrollment(auth_user.id(), course_id).await {
                    Ok(enrollment) => enrollment.is_some(),
                    Err(e) => {
                        return Ok(storage_error_response(
                            "Check enrollment failed",
                            e,
                            ErrorCode::StudentNotEnrolled,
                        ));
                    }
                }
            }
            _ => false,
        };
        if !is_member {
            return Ok(forbidden_response("You are not a member of this course"));
        }
    }

    match storage
        .list_announcements_with_pagination(
            course_id,
            include_drafts,
            query.pagination.page,
            query.pagination.size,
        )
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Announcements retrieved",
        ))),
        Err(e) => Ok(storage_error_response(
            "List announcements failed",
            e,
            ErrorCode::AnnouncementNotFound,
        )),
    }
}
