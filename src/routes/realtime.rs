use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use tracing::info;

use crate::cache::ObjectCache;
use crate::middlewares::require_jwt::authenticate_token;
use crate::models::{ApiResponse, ErrorCode};
use crate::realtime::session::run_session;
use crate::storage::Storage;

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    // 浏览器 WebSocket 无法设置请求头，token 走查询参数
    pub token: String,
}

fn reject(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::error_empty(ErrorCode::Unauthorized, message))
}

pub async fn connect(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<RealtimeQuery>,
    storage: web::Data<Arc<dyn Storage>>,
    cache: web::Data<Arc<dyn ObjectCache>>,
) -> ActixResult<HttpResponse> {
    let user = match authenticate_token(&query.token, storage.get_ref(), cache.get_ref()).await {
        Ok(user) => user,
        Err(e) => {
            info!("Realtime handshake rejected: {}", e);
            return Ok(reject("Invalid or expired token"));
        }
    };

    let (response, session, stream) = actix_ws::handle(&req, body)?;
    actix_web::rt::spawn(run_session(user.id(), user.role(), session, stream));

    Ok(response)
}

pub fn configure_realtime_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/realtime", web::get().to(connect));
}
