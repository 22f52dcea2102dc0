use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotificationService;
use crate::models::notifications::responses::MarkAllReadResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::storage_error_response;

// 只能标记自己的通知
pub async fn mark_as_read(
    service: &NotificationService,
    request: &HttpRequest,
    id: i64,
    user_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.mark_notification_read(id, user_id).await {
        Ok(Some(notification)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            notification,
            "Notification marked as read",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::NotificationNotFound,
            "Notification not found",
        ))),
        Err(e) => Ok(storage_error_response(
            "Mark notification read failed",
            e,
            ErrorCode::NotificationNotFound,
        )),
    }
}

pub async fn mark_all_as_read(
    service: &NotificationService,
    request: &HttpRequest,
    user_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.mark_all_notifications_read(user_id).await {
        Ok(count) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            MarkAllReadResponse {
                marked_count: count,
            },
            "All notifications marked as read",
        ))),
        Err(e) => Ok(storage_error_response(
            "Mark all notifications read failed",
            e,
            ErrorCode::InternalServerError,
        )),
    }
}
