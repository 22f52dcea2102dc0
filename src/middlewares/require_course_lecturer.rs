/*!
 * 课程讲师访问控制中间件
 *
 * 必须在 RequireJWT 之后使用，作用于带 `{course_id}` 路径参数的路由。
 * 只有该课程的授课讲师（或管理员）可以继续，通过后课程写入请求扩展。
 *
 * ```rust,ignore
 * web::resource("/{course_id}/grades/export")
 *     .wrap(RequireCourseLecturer)
 *     .route(web::get().to(export_grades))
 * ```
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, error};

use crate::{
    models::{ErrorCode, courses::entities::Course, users::entities::AuthUser},
    storage::Storage,
};

use super::create_error_response;

#[derive(Clone)]
pub struct RequireCourseLecturer;

impl<S, B> Transform<S, ServiceRequest> for RequireCourseLecturer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireCourseLecturerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireCourseLecturerMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireCourseLecturerMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireCourseLecturerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            // 1. 会话
            let Some(user) = req.extensions().get::<AuthUser>().cloned() else {
                return Ok(req.into_response(
                    create_error_response(
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::Unauthorized,
                        "Unauthorized: missing session",
                    )
                    .map_into_right_body(),
                ));
            };

            // 2. course_id
            let Some(course_id) = req
                .match_info()
                .get("course_id")
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|id| *id > 0)
            else {
                return Ok(req.into_response(
                    create_error_response(
                        StatusCode::BAD_REQUEST,
                        ErrorCode::BadRequest,
                        "Missing or invalid course_id",
                    )
                    .map_into_right_body(),
                ));
            };

            // 3. 加载课程
            let course = match load_course(&req, course_id).await {
                Ok(Some(course)) => course,
                Ok(None) => {
                    return Ok(req.into_response(
                        create_error_response(
                            StatusCode::NOT_FOUND,
                            ErrorCode::CourseNotFound,
                            "Course not found",
                        )
                        .map_into_right_body(),
                    ));
                }
                Err(msg) => {
                    error!("Failed to load course {}: {}", course_id, msg);
                    return Ok(req.into_response(
                        create_error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorCode::InternalServerError,
                            "Failed to load course",
                        )
                        .map_into_right_body(),
                    ));
                }
            };

            // 4. 授课讲师或管理员
            if user.is_admin() || course.is_taught_by(user.id()) {
                debug!("User {} may manage course {}", user.id(), course.id);
                req.extensions_mut().insert(course);
                let res = srv.call(req).await?.map_into_left_body();
                Ok(res)
            } else {
                Ok(req.into_response(
                    create_error_response(
                        StatusCode::FORBIDDEN,
                        ErrorCode::CoursePermissionDenied,
                        "Only the course lecturer can do this",
                    )
                    .map_into_right_body(),
                ))
            }
        })
    }
}

impl RequireCourseLecturer {
    /// 通过校验的课程
    pub fn extract_course(req: &actix_web::HttpRequest) -> Option<Course> {
        req.extensions().get::<Course>().cloned()
    }
}

async fn load_course(req: &ServiceRequest, course_id: i64) -> Result<Option<Course>, String> {
    let storage = req
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .ok_or_else(|| "Storage not configured".to_string())?
        .get_ref()
        .clone();

    storage
        .get_course_by_id(course_id)
        .await
        .map_err(|e| e.to_string())
}
