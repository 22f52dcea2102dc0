use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::feedback::requests::{CreateFeedbackRequest, FeedbackListParams};
use crate::models::profiles::entities::UserRole;
use crate::services::FeedbackService;
use crate::utils::SafeIDI64;

static FEEDBACK_SERVICE: Lazy<FeedbackService> = Lazy::new(FeedbackService::new_lazy);

pub async fn create_feedback(
    req: HttpRequest,
    feedback_data: web::Json<CreateFeedbackRequest>,
) -> ActixResult<HttpResponse> {
    FEEDBACK_SERVICE
        .create_feedback(&req, feedback_data.into_inner())
        .await
}

pub async fn list_feedback(
    req: HttpRequest,
    query: web::Query<FeedbackListParams>,
) -> ActixResult<HttpResponse> {
    FEEDBACK_SERVICE.list_feedback(&req, query.into_inner()).await
}

pub async fn mark_read(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    FEEDBACK_SERVICE.mark_read(&req, id.0).await
}

pub fn configure_feedback_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/feedback")
            .wrap(middlewares::RequireJWT)
            .service(web::resource("").route(web::get().to(list_feedback)).route(
                web::post()
                    .to(create_feedback)
                    .wrap(middlewares::RequireRole::new_any(UserRole::lecturer_roles())),
            ))
            .service(
                // 仅接收反馈的学生本人可标记
                web::resource("/{id}/read").route(
                    web::post()
                        .to(mark_read)
                        .wrap(middlewares::RequireRole::new_any(UserRole::student_roles())),
                ),
            ),
    );
}
