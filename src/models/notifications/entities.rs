use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 通知类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub enum NotificationType {
    GradePublished,
    GradeUpdated,
    FeedbackReceived,
    Announcement,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::GradePublished => write!(f, "grade_published"),
            NotificationType::GradeUpdated => write!(f, "grade_updated"),
            NotificationType::FeedbackReceived => write!(f, "feedback_received"),
            NotificationType::Announcement => write!(f, "announcement"),
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grade_published" => Ok(NotificationType::GradePublished),
            "grade_updated" => Ok(NotificationType::GradeUpdated),
            "feedback_received" => Ok(NotificationType::FeedbackReceived),
            "announcement" => Ok(NotificationType::Announcement),
            _ => Err(format!("Invalid notification type: {s}")),
        }
    }
}

/// 站内通知
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub is_email_sent: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 待写入的通知（随业务写操作在同一事务内插入）
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub related_id: Option<i64>,
}

impl NewNotification {
    pub fn grade_published(student_id: i64, grade_id: i64, assignment_title: &str) -> Self {
        Self {
            user_id: student_id,
            title: "Grade Published".to_string(),
            message: format!("Your grade for \"{assignment_title}\" has been published."),
            notification_type: NotificationType::GradePublished,
            related_id: Some(grade_id),
        }
    }

    pub fn grade_updated(student_id: i64, grade_id: i64, assignment_title: &str) -> Self {
        Self {
            user_id: student_id,
            title: "Grade Updated".to_string(),
            message: format!("Your grade for \"{assignment_title}\" has been updated."),
            notification_type: NotificationType::GradeUpdated,
            related_id: Some(grade_id),
        }
    }

    pub fn feedback_received(student_id: i64, feedback_id: i64) -> Self {
        Self {
            user_id: student_id,
            title: "New Feedback Received".to_string(),
            message: "Your lecturer has sent you feedback on a grade.".to_string(),
            notification_type: NotificationType::FeedbackReceived,
            related_id: Some(feedback_id),
        }
    }

    pub fn announcement(student_id: i64, announcement_id: i64, course_code: &str, title: &str) -> Self {
        Self {
            user_id: student_id,
            title: format!("{course_code}: {title}"),
            message: format!("A new announcement was posted in {course_code}."),
            notification_type: NotificationType::Announcement,
            related_id: Some(announcement_id),
        }
    }
}
