//! 固定窗口限流
//!
//! 计数键为 `范围:身份:窗口序号`，窗口序号 = 当前秒数 / 窗口长度，
//! 所以窗口边界是对齐的，旧窗口的计数自然过期。
//! 身份优先取已认证的用户 ID，否则取客户端 IP。
//!
//! ```rust,ignore
//! web::resource("/login")
//!     .route(web::post().to(login).wrap(RateLimit::login()))
//! ```

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};

// 窗口长度上限；计数条目最多保留这么久
const MAX_WINDOW_SECS: u64 = 3600;

static COUNTERS: Lazy<Cache<String, u32>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(MAX_WINDOW_SECS))
        .max_capacity(100_000)
        .build()
});

#[derive(Clone)]
pub struct RateLimit {
    max_requests: u32,
    window_secs: u64,
    scope: &'static str,
}

impl RateLimit {
    pub fn new(scope: &'static str, max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs: window_secs.clamp(1, MAX_WINDOW_SECS),
            scope,
        }
    }

    fn per_minute(scope: &'static str, max_requests: u32) -> Self {
        Self::new(scope, max_requests, 60)
    }

    pub fn login() -> Self {
        Self::per_minute("login", AppConfig::get().rate_limit.login_per_minute)
    }

    pub fn register() -> Self {
        Self::per_minute("register", AppConfig::get().rate_limit.register_per_minute)
    }

    pub fn refresh_token() -> Self {
        Self::per_minute("refresh", AppConfig::get().rate_limit.refresh_per_minute)
    }

    /// 学生提交选课申请
    pub fn enrollment_request() -> Self {
        Self::per_minute(
            "enrollment_request",
            AppConfig::get().rate_limit.enrollment_request_per_minute,
        )
    }
}

/// 限流结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: u64 },
}

fn counter_key(scope: &str, identity: &str, now_secs: u64, window_secs: u64) -> String {
    format!("{scope}:{identity}:{}", now_secs / window_secs)
}

/// 计数加一并判定是否放行
async fn consume(
    counters: &Cache<String, u32>,
    limit: &RateLimit,
    identity: &str,
    now_secs: u64,
) -> Decision {
    let key = counter_key(limit.scope, identity, now_secs, limit.window_secs);
    let count = counters
        .entry(key)
        .and_upsert_with(|current| {
            let next = current.map(|e| *e.value()).unwrap_or(0).saturating_add(1);
            std::future::ready(next)
        })
        .await
        .into_value();

    if count > limit.max_requests {
        Decision::Limited {
            retry_after: limit.window_secs - now_secs % limit.window_secs,
        }
    } else {
        Decision::Allowed {
            remaining: limit.max_requests - count,
        }
    }
}

/// 接受裸 IP 或带端口的套接字地址
fn parse_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .or_else(|_| raw.parse::<SocketAddr>().map(|addr| addr.ip()))
        .ok()
        .map(|ip| ip.to_string())
}

/// 客户端 IP：连接地址优先，其次 X-Forwarded-For 首项与 X-Real-IP
fn client_ip(req: &ServiceRequest) -> String {
    let connection = req.connection_info().realip_remote_addr().map(str::to_string);
    if let Some(ip) = connection.as_deref().and_then(parse_ip) {
        return ip;
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    header("X-Forwarded-For")
        .and_then(|v| v.split(',').next())
        .and_then(parse_ip)
        .or_else(|| header("X-Real-IP").and_then(parse_ip))
        .or(connection)
        .unwrap_or_else(|| "unknown".to_string())
}

fn identity(req: &ServiceRequest) -> String {
    // connection_info() 会写入 extensions，先释放借用
    let user_id = req.extensions().get::<AuthUser>().map(|user| user.id());
    match user_id {
        Some(id) => format!("user:{id}"),
        None => format!("ip:{}", client_ip(req)),
    }
}

fn limited_response(retry_after: u64) -> HttpResponse {
    HttpResponse::TooManyRequests()
        .insert_header(("Retry-After", retry_after.to_string()))
        .insert_header(("X-RateLimit-Remaining", "0"))
        .json(ApiResponse::error_empty(
            ErrorCode::RateLimitExceeded,
            "Too many requests, please try again later",
        ))
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limit: self.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limit: RateLimit,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let limit = self.limit.clone();

        Box::pin(async move {
            let who = identity(&req);
            let now = chrono::Utc::now().timestamp().max(0) as u64;

            match consume(&COUNTERS, &limit, &who, now).await {
                Decision::Limited { retry_after } => {
                    warn!("Rate limit '{}' exceeded by {}", limit.scope, who);
                    Ok(req.into_response(limited_response(retry_after).map_into_right_body()))
                }
                Decision::Allowed { remaining } => {
                    let mut res = srv.call(req).await?;
                    let headers = res.headers_mut();
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-limit"),
                        HeaderValue::from(limit.max_requests),
                    );
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_are_aligned() {
        assert_eq!(counter_key("login", "ip:1.2.3.4", 119, 60), "login:ip:1.2.3.4:1");
        assert_eq!(counter_key("login", "ip:1.2.3.4", 120, 60), "login:ip:1.2.3.4:2");
    }

    #[test]
    fn test_parse_ip_rejects_garbage() {
        assert_eq!(parse_ip(" 10.0.0.7 ").as_deref(), Some("10.0.0.7"));
        assert_eq!(parse_ip("10.0.0.7:8080").as_deref(), Some("10.0.0.7"));
        assert!(parse_ip("not-an-ip").is_none());
    }

    #[test]
    fn test_anonymous_identity_uses_peer_ip() {
        let req = actix_web::test::TestRequest::default()
            .peer_addr("10.1.2.3:4567".parse().unwrap())
            .to_srv_request();
        assert_eq!(identity(&req), "ip:10.1.2.3");

        let forwarded = actix_web::test::TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.1"))
            .to_srv_request();
        assert_eq!(identity(&forwarded), "ip:203.0.113.9");
    }

    #[tokio::test]
    async fn test_consume_limits_within_window() {
        let counters = Cache::new(100);
        let limit = RateLimit::new("test", 2, 60);

        assert_eq!(
            consume(&counters, &limit, "user:1", 600).await,
            Decision::Allowed { remaining: 1 }
        );
        assert_eq!(
            consume(&counters, &limit, "user:1", 610).await,
            Decision::Allowed { remaining: 0 }
        );
        assert_eq!(
            consume(&counters, &limit, "user:1", 615).await,
            Decision::Limited { retry_after: 45 }
        );
        // 其他用户与下一个窗口不受影响
        assert_eq!(
            consume(&counters, &limit, "user:2", 615).await,
            Decision::Allowed { remaining: 1 }
        );
        assert_eq!(
            consume(&counters, &limit, "user:1", 660).await,
            Decision::Allowed { remaining: 1 }
        );
    }

    #[actix_web::test]
    async fn test_middleware_answers_429() {
        use actix_web::{App, http::StatusCode, test, web};

        let app = test::init_service(App::new().route(
            "/",
            web::post()
                .to(HttpResponse::Ok)
                .wrap(RateLimit::new("middleware_smoke", 1, MAX_WINDOW_SECS)),
        ))
        .await;

        let first = test::call_service(&app, test::TestRequest::post().uri("/").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("x-ratelimit-remaining").unwrap(), "0");

        let second =
            test::call_service(&app, test::TestRequest::post().uri("/").to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key("retry-after"));
    }
}
