//! SeaORM 实体定义
//!
//! 这些实体用于数据库操作，与 models 模块中的业务实体分离。
//! Storage 层使用这些实体进行 CRUD 操作，然后转换为 models 中的业务实体。
//! 时间统一以 Unix 秒存储。

pub mod prelude;

pub mod announcements;
pub mod assignments;
pub mod courses;
pub mod enrollment_requests;
pub mod enrollments;
pub mod feedback;
pub mod grades;
pub mod notifications;
pub mod profiles;
pub mod users;

use chrono::{DateTime, Utc};

/// Unix 秒转 UTC 时间
pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
