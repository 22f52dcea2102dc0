use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{CourseHubError, Result};

// 选课状态；退课只把状态改为 inactive，不删除记录
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub enum EnrollmentStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Active => write!(f, "active"),
            EnrollmentStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "inactive" => Ok(EnrollmentStatus::Inactive),
            _ => Err(format!("Invalid enrollment status: {s}")),
        }
    }
}

// 选课申请状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub enum EnrollmentRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl EnrollmentRequestStatus {
    /// 审核申请：只有 pending 可以转为 approved / rejected
    pub fn review(self, approve: bool) -> Result<Self> {
        match self {
            EnrollmentRequestStatus::Pending if approve => Ok(EnrollmentRequestStatus::Approved),
            EnrollmentRequestStatus::Pending => Ok(EnrollmentRequestStatus::Rejected),
            reviewed => Err(CourseHubError::invalid_transition(format!(
                "Enrollment request has already been {reviewed}"
            ))),
        }
    }
}

impl std::fmt::Display for EnrollmentRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentRequestStatus::Pending => write!(f, "pending"),
            EnrollmentRequestStatus::Approved => write!(f, "approved"),
            EnrollmentRequestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for EnrollmentRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EnrollmentRequestStatus::Pending),
            "approved" => Ok(EnrollmentRequestStatus::Approved),
            "rejected" => Ok(EnrollmentRequestStatus::Rejected),
            _ => Err(format!("Invalid enrollment request status: {s}")),
        }
    }
}

// 选课记录
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub status: EnrollmentStatus,
    pub enrollment_date: chrono::DateTime<chrono::Utc>,
}

// 选课申请
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollmentRequest {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub request_date: chrono::DateTime<chrono::Utc>,
    pub status: EnrollmentRequestStatus,
    pub message: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_can_be_reviewed() {
        assert_eq!(
            EnrollmentRequestStatus::Pending.review(true).unwrap(),
            EnrollmentRequestStatus::Approved
        );
        assert_eq!(
            EnrollmentRequestStatus::Pending.review(false).unwrap(),
            EnrollmentRequestStatus::Rejected
        );
    }

    #[test]
    fn test_reviewed_requests_are_terminal() {
        for status in [
            EnrollmentRequestStatus::Approved,
            EnrollmentRequestStatus::Rejected,
        ] {
            let err = status.review(true).unwrap_err();
            assert_eq!(err.code(), "E014");
            assert!(status.review(false).is_err());
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "approved".parse::<EnrollmentRequestStatus>().unwrap(),
            EnrollmentRequestStatus::Approved
        );
        assert_eq!(
            "inactive".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Inactive
        );
        assert!("dropped".parse::<EnrollmentStatus>().is_err());
    }
}
