//! 统一错误处理
//!
//! 错误类型由宏生成，每个变体带错误代码与类型名称。
//! 业务规则冲突各有独立变体，[`CourseHubError::status_code`] 据此映射 HTTP 状态码。

use actix_web::http::StatusCode;
use std::fmt;

/// 生成 enum、`code()`、`error_type()`、`message()` 与 snake_case 构造函数
macro_rules! define_coursehub_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum CourseHubError {
            $($variant(String),)*
        }

        impl CourseHubError {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CourseHubError::$variant(_) => $code,)*
                }
            }

            pub fn error_type(&self) -> &'static str {
                match self {
                    $(CourseHubError::$variant(_) => $type_name,)*
                }
            }

            pub fn message(&self) -> &str {
                match self {
                    $(CourseHubError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl CourseHubError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        CourseHubError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_coursehub_errors! {
    CacheConnection("E001", "Cache Connection Error"),
    DatabaseConfig("E003", "Database Configuration Error"),
    DatabaseConnection("E004", "Database Connection Error"),
    DatabaseOperation("E005", "Database Operation Error"),
    Io("E006", "IO Error"),
    Validation("E007", "Validation Error"),
    NotFound("E008", "Resource Not Found"),
    Serialization("E009", "Serialization Error"),
    Conflict("E010", "Conflict"),
    Authentication("E012", "Authentication Error"),
    Authorization("E013", "Authorization Error"),
    InvalidTransition("E014", "Invalid State Transition"),
    Export("E015", "Export Error"),
}

impl CourseHubError {
    /// 客户端可修正的错误映射到 4xx，其余为 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            CourseHubError::Validation(_) => StatusCode::BAD_REQUEST,
            CourseHubError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CourseHubError::Authorization(_) => StatusCode::FORBIDDEN,
            CourseHubError::NotFound(_) => StatusCode::NOT_FOUND,
            CourseHubError::Conflict(_) | CourseHubError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl fmt::Display for CourseHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for CourseHubError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CourseHubError {
    fn from(err: sea_orm::DbErr) -> Self {
        CourseHubError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for CourseHubError {
    fn from(err: std::io::Error) -> Self {
        CourseHubError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CourseHubError {
    fn from(err: serde_json::Error) -> Self {
        CourseHubError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for CourseHubError {
    fn from(err: csv::Error) -> Self {
        CourseHubError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CourseHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CourseHubError::cache_connection("test").code(), "E001");
        assert_eq!(CourseHubError::database_config("test").code(), "E003");
        assert_eq!(CourseHubError::validation("test").code(), "E007");
        assert_eq!(CourseHubError::conflict("test").code(), "E010");
        assert_eq!(CourseHubError::invalid_transition("test").code(), "E014");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CourseHubError::invalid_transition("published").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            CourseHubError::authentication("expired").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert!(CourseHubError::not_found("gone").is_client_error());
        assert!(!CourseHubError::export("csv").is_client_error());
    }

    #[test]
    fn test_display() {
        let err = CourseHubError::conflict("Course code already exists");
        assert_eq!(err.to_string(), "Conflict: Course code already exists");
    }

    #[test]
    fn test_db_error_conversion() {
        let err: CourseHubError = sea_orm::DbErr::Custom("broken".into()).into();
        assert_eq!(err.code(), "E005");
        assert!(err.message().contains("broken"));
    }
}
