use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotificationService;
use crate::models::notifications::requests::{NotificationListParams, NotificationListQuery};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::storage_error_response;

pub async fn list_notifications(
    service: &NotificationService,
    request: &HttpRequest,
    user_id: i64,
    query: NotificationListParams,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let list_query = NotificationListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        is_read: query.is_read,
        notification_type: query.notification_type,
    };

    match storage
        .list_notifications_with_pagination(user_id, list_query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Notifications retrieved",
        ))),
        Err(e) => Ok(storage_error_response(
            "List notifications failed",
            e,
            ErrorCode::NotificationNotFound,
        )),
    }
}
