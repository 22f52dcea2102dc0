use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AnnouncementService;
use crate::middlewares::RequireJWT;
use crate::models::announcements::requests::CreateAnnouncementRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{load_managed_course, storage_error_response, unauthorized_response};

pub async fn create_announcement(
    service: &AnnouncementService,
    request: &HttpRequest,
    course_id: i64,
    announcement_data: CreateAnnouncementRequest,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    if let Err(resp) = load_managed_course(&storage, &auth_user, course_id).await {
        return Ok(resp);
    }

    match storage
        .create_announcement(course_id, auth_user.id(), announcement_data)
        .await
    {
        Ok(announcement) => Ok(HttpResponse::Created().json(ApiResponse::success(
            announcement,
            "Announcement created",
        ))),
        Err(e) => Ok(storage_error_response(
            "Create announcement failed",
            e,
            ErrorCode::AnnouncementCreationFailed,
        )),
    }
}

/// 发布并通知选课学生
pub async fn publish_announcement(
    service: &AnnouncementService,
    request: &HttpRequest,
    id: i64,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    let announcement = match storage.get_announcement_by_id(id).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AnnouncementNotFound,
                "Announcement not found",
            )));
        }
        Err(e) => {
            return Ok(storage_error_response(
                "Load announcement failed",
                e,
                ErrorCode::AnnouncementNotFound,
            ));
        }
    };
    if let Err(resp) = load_managed_course(&storage, &auth_user, announcement.course_id).await {
        return Ok(resp);
    }

    match storage.publish_announcement(id).await {
        Ok(published) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            published,
            "Announcement published",
        ))),
        Err(e) => Ok(storage_error_response(
            "Publish announcement failed",
            e,
            ErrorCode::AnnouncementNotFound,
        )),
    }
}
