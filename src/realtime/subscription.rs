//! 订阅权限
//!
//! - 通知表只能订阅自己的（强制 `user_id = 本人`）
//! - 课程、作业、公告不含个人数据，可任意订阅
//! - 学生（以及尚未建档的账号）订阅其它表时必须按本人 ID 过滤
//! - 讲师与管理员可订阅任意表

use super::hub::{ChangeFilter, ChangeTable};
use crate::models::profiles::entities::UserRole;

/// 校验订阅请求，返回最终生效的过滤条件
pub fn authorize_subscription(
    role: Option<UserRole>,
    user_id: i64,
    table: ChangeTable,
    filter: Option<ChangeFilter>,
) -> Result<Option<ChangeFilter>, String> {
    if let Some(f) = &filter
        && !table.filter_columns().contains(&f.column.as_str())
    {
        return Err(format!(
            "Column '{}' cannot be used to filter {:?}",
            f.column, table
        ));
    }

    if table == ChangeTable::Notifications {
        return match filter {
            Some(f) if f.value != user_id => {
                Err("Notifications can only be subscribed for yourself".to_string())
            }
            _ => Ok(Some(ChangeFilter {
                column: "user_id".to_string(),
                value: user_id,
            })),
        };
    }

    if table.is_public() || matches!(role, Some(UserRole::Lecturer | UserRole::Admin)) {
        return Ok(filter);
    }

    let owner_column = match table {
        ChangeTable::Profiles => "id",
        _ => "student_id",
    };
    match filter {
        Some(f) if f.column == owner_column && f.value == user_id => Ok(Some(f)),
        _ => Err(format!(
            "Subscriptions to {table:?} must filter on {owner_column} = {user_id}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(column: &str, value: i64) -> Option<ChangeFilter> {
        Some(ChangeFilter {
            column: column.to_string(),
            value,
        })
    }

    #[test]
    fn test_student_must_filter_own_rows() {
        let student = Some(UserRole::Student);
        assert!(
            authorize_subscription(student, 7, ChangeTable::Grades, filter("student_id", 7))
                .is_ok()
        );
        assert!(
            authorize_subscription(student, 7, ChangeTable::Grades, filter("student_id", 8))
                .is_err()
        );
        assert!(authorize_subscription(student, 7, ChangeTable::Grades, None).is_err());
        assert!(
            authorize_subscription(student, 7, ChangeTable::Grades, filter("course_id", 1))
                .is_err()
        );
    }

    #[test]
    fn test_public_tables_open_to_everyone() {
        assert_eq!(
            authorize_subscription(Some(UserRole::Student), 7, ChangeTable::Courses, None),
            Ok(None)
        );
        assert!(
            authorize_subscription(None, 7, ChangeTable::Assignments, filter("course_id", 3))
                .is_ok()
        );
    }

    #[test]
    fn test_notifications_forced_to_self() {
        let effective =
            authorize_subscription(Some(UserRole::Admin), 4, ChangeTable::Notifications, None)
                .unwrap();
        assert_eq!(effective, filter("user_id", 4));
        assert!(
            authorize_subscription(
                Some(UserRole::Admin),
                4,
                ChangeTable::Notifications,
                filter("user_id", 5)
            )
            .is_err()
        );
    }

    #[test]
    fn test_lecturer_may_watch_course_grades() {
        assert!(
            authorize_subscription(
                Some(UserRole::Lecturer),
                2,
                ChangeTable::Grades,
                filter("course_id", 11)
            )
            .is_ok()
        );
        assert!(
            authorize_subscription(
                Some(UserRole::Lecturer),
                2,
                ChangeTable::Grades,
                filter("marks_obtained", 11)
            )
            .is_err()
        );
    }
}
