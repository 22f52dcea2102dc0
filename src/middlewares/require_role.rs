/*!
 * 基于角色的访问控制中间件
 *
 * 必须在 RequireJWT 之后使用。角色取自个人资料，尚未建档的账号一律拒绝。
 *
 * ```rust,ignore
 * web::scope("/grades")
 *     .wrap(RequireRole::new_any(UserRole::lecturer_roles()))
 *     .wrap(RequireJWT)
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
use std::rc::Rc;
use tracing::info;

use crate::models::{ErrorCode, profiles::entities::UserRole, users::entities::AuthUser};

use super::create_error_response;

#[derive(Clone)]
pub struct RequireRole {
    required_roles: Vec<UserRole>,
}

impl RequireRole {
    /// 需要特定角色
    pub fn new(role: &UserRole) -> Self {
        Self {
            required_roles: vec![*role],
        }
    }

    /// 需要任一角色
    pub fn new_any(roles: &[&UserRole]) -> Self {
        Self {
            required_roles: roles.iter().map(|r| **r).collect(),
        }
    }

    fn permits(required: &[UserRole], role: Option<UserRole>) -> bool {
        role.is_some_and(|r| required.contains(&r))
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            required_roles: self.required_roles.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    required_roles: Vec<UserRole>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
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
        let required_roles = self.required_roles.clone();

        Box::pin(async move {
            let user = req.extensions().get::<AuthUser>().cloned();

            match user {
                Some(user) => {
                    let role = user.role();
                    if RequireRole::permits(&required_roles, role) {
                        let res = srv.call(req).await?.map_into_left_body();
                        Ok(res)
                    } else {
                        info!(
                            "Access denied for user {} (role: {:?}). Required roles: {:?}",
                            user.id(),
                            role,
                            required_roles
                        );
                        let message = if role.is_none() {
                            "Profile required"
                        } else {
                            "Access denied."
                        };
                        Ok(req.into_response(
                            create_error_response(
                                StatusCode::FORBIDDEN,
                                ErrorCode::Forbidden,
                                message,
                            )
                            .map_into_right_body(),
                        ))
                    }
                }
                None => {
                    info!(
                        "Role check failed: no session in request. Make sure RequireJWT middleware is applied first."
                    );
                    Ok(req.into_response(
                        create_error_response(
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::Unauthorized,
                            "Authentication required",
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits() {
        let lecturer = RequireRole::new_any(UserRole::lecturer_roles());
        assert!(RequireRole::permits(
            &lecturer.required_roles,
            Some(UserRole::Admin)
        ));
        assert!(RequireRole::permits(
            &lecturer.required_roles,
            Some(UserRole::Lecturer)
        ));
        assert!(!RequireRole::permits(
            &lecturer.required_roles,
            Some(UserRole::Student)
        ));
        assert!(!RequireRole::permits(&lecturer.required_roles, None));

        let admin = RequireRole::new(&UserRole::Admin);
        assert!(!RequireRole::permits(
            &admin.required_roles,
            Some(UserRole::Lecturer)
        ));
    }

    fn session(role: Option<UserRole>) -> AuthUser {
        let now = chrono::Utc::now();
        AuthUser {
            user: crate::models::users::entities::User {
                id: 11,
                email: "amy@uni.edu".into(),
                password_hash: String::new(),
                status: crate::models::users::entities::UserStatus::Active,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            profile: role.map(|role| crate::models::profiles::entities::Profile {
                id: 11,
                email: "amy@uni.edu".into(),
                full_name: "Amy Lee".into(),
                role,
                student_id: None,
                lecturer_id: None,
                department: Some("Physics".into()),
                year_of_study: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            }),
        }
    }

    async fn status_for(user: Option<AuthUser>) -> StatusCode {
        use actix_web::{App, HttpResponse, dev::Service as _, test, web};

        let app = test::init_service(
            App::new()
                .wrap_fn(move |req, srv| {
                    if let Some(user) = user.clone() {
                        req.extensions_mut().insert(user);
                    }
                    srv.call(req)
                })
                .route(
                    "/",
                    web::post()
                        .to(HttpResponse::Ok)
                        .wrap(RequireRole::new_any(UserRole::lecturer_roles())),
                ),
        )
        .await;
        test::call_service(&app, test::TestRequest::post().uri("/").to_request())
            .await
            .status()
    }

    #[actix_web::test]
    async fn test_middleware_statuses() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some(session(None))).await, StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(Some(session(Some(UserRole::Student)))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(Some(session(Some(UserRole::Lecturer)))).await,
            StatusCode::OK
        );
    }
}
