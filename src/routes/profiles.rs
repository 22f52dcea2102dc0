use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::profiles::requests::{CreateProfileRequest, UpdateProfileRequest};
use crate::services::AuthService;
use crate::utils::SafeProfileIdI64;

// 资料操作与认证共用同一个服务
static PROFILE_SERVICE: Lazy<AuthService> = Lazy::new(AuthService::new_lazy);

pub async fn create_profile(
    req: HttpRequest,
    profile_data: web::Json<CreateProfileRequest>,
) -> ActixResult<HttpResponse> {
    PROFILE_SERVICE
        .create_profile(profile_data.into_inner(), &req)
        .await
}

pub async fn update_my_profile(
    req: HttpRequest,
    update_data: web::Json<UpdateProfileRequest>,
) -> ActixResult<HttpResponse> {
    PROFILE_SERVICE
        .update_profile(update_data.into_inner(), &req)
        .await
}

pub async fn get_profile(
    req: HttpRequest,
    profile_id: SafeProfileIdI64,
) -> ActixResult<HttpResponse> {
    PROFILE_SERVICE.get_profile(profile_id.0, &req).await
}

pub fn configure_profile_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/profiles")
            .wrap(middlewares::RequireJWT)
            .service(web::resource("").route(web::post().to(create_profile)))
            .service(web::resource("/me").route(web::put().to(update_my_profile)))
            .service(web::resource("/{profile_id}").route(web::get().to(get_profile))),
    );
}
