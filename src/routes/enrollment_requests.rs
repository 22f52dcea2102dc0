use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::enrollments::requests::{
    CreateEnrollmentRequest, EnrollmentRequestQueryParams,
};
use crate::models::profiles::entities::UserRole;
use crate::services::EnrollmentRequestService;
use crate::utils::SafeIDI64;

static ENROLLMENT_REQUEST_SERVICE: Lazy<EnrollmentRequestService> =
    Lazy::new(EnrollmentRequestService::new_lazy);

pub async fn create_request(
    req: HttpRequest,
    create_data: web::Json<CreateEnrollmentRequest>,
) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE
        .create_request(&req, create_data.into_inner())
        .await
}

pub async fn list_requests(
    req: HttpRequest,
    query: web::Query<EnrollmentRequestQueryParams>,
) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE
        .list_requests(&req, query.into_inner())
        .await
}

pub async fn approve_request(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE.approve_request(&req, id.0).await
}

pub async fn reject_request(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE.reject_request(&req, id.0).await
}

pub fn configure_enrollment_request_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/enrollment-requests")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_requests))
                    .route(
                        web::post()
                            .to(create_request)
                            .wrap(middlewares::RateLimit::enrollment_request())
                            .wrap(middlewares::RequireRole::new_any(UserRole::student_roles())),
                    ),
            )
            .service(
                // 审批由服务层再校验是否为该课程讲师
                web::resource("/{id}/approve").route(
                    web::post()
                        .to(approve_request)
                        .wrap(middlewares::RequireRole::new_any(UserRole::lecturer_roles())),
                ),
            )
            .service(
                web::resource("/{id}/reject").route(
                    web::post()
                        .to(reject_request)
                        .wrap(middlewares::RequireRole::new_any(UserRole::lecturer_roles())),
                ),
            ),
    );
}
