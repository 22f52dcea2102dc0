//! 路径参数安全提取器
//!
//! 路径中的 ID 解析失败时返回统一的 400 响应，而不是 actix 默认的纯文本 404。

use actix_web::{HttpResponse, error::InternalError};

use crate::models::{ApiResponse, ErrorCode};

/// 生成按参数名提取 i64 路径参数的提取器
///
/// ```ignore
/// define_safe_i64_extractor!(SafeCourseIdI64, "course_id");
/// async fn handler(course_id: SafeCourseIdI64) { course_id.0 }
/// ```
#[macro_export]
macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub i64);

        impl actix_web::FromRequest for $name {
            type Error = actix_web::Error;
            type Future = std::future::Ready<Result<Self, Self::Error>>;

            fn from_request(
                req: &actix_web::HttpRequest,
                _payload: &mut actix_web::dev::Payload,
            ) -> Self::Future {
                std::future::ready(
                    $crate::utils::extractor::parse_positive_i64(
                        req.match_info().get($param),
                        $param,
                    )
                    .map($name),
                )
            }
        }
    };
}

/// 解析正整数 ID，失败时生成带响应体的错误
pub fn parse_positive_i64(raw: Option<&str>, param: &str) -> Result<i64, actix_web::Error> {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(id) if id > 0 => Ok(id),
        _ => {
            let response = HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::BadRequest,
                format!("Invalid path parameter '{param}'"),
            ));
            Err(InternalError::from_response(format!("invalid {param}"), response).into())
        }
    }
}

define_safe_i64_extractor!(SafeIDI64, "id");
define_safe_i64_extractor!(SafeCourseIdI64, "course_id");
define_safe_i64_extractor!(SafeStudentIdI64, "student_id");
define_safe_i64_extractor!(SafeProfileIdI64, "profile_id");

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::FromRequest;
    use actix_web::test::TestRequest;

    #[test]
    fn test_parse_positive_i64() {
        assert_eq!(parse_positive_i64(Some("42"), "id").unwrap(), 42);
        assert!(parse_positive_i64(Some("0"), "id").is_err());
        assert!(parse_positive_i64(Some("-3"), "id").is_err());
        assert!(parse_positive_i64(Some("abc"), "id").is_err());
        assert!(parse_positive_i64(None, "id").is_err());
    }

    #[actix_web::test]
    async fn test_extractor_reads_named_param() {
        let req = TestRequest::default()
            .param("course_id", "7")
            .to_http_request();
        let mut payload = actix_web::dev::Payload::None;
        let extracted = SafeCourseIdI64::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(extracted.0, 7);

        let missing = SafeIDI64::from_request(&req, &mut payload).await;
        assert!(missing.is_err());
    }
}
