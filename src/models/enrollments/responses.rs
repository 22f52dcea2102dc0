use super::entities::{Enrollment, EnrollmentRequest};
use crate::models::common::PaginationInfo;
use crate::models::courses::entities::Course;
use crate::models::profiles::entities::Profile;
use serde::Serialize;
use ts_rs::TS;

// 申请列表项（附学生与课程）
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollmentRequestItem {
    pub request: EnrollmentRequest,
    pub student: Option<Profile>,
    pub course: Option<Course>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollmentRequestListResponse {
    pub items: Vec<EnrollmentRequestItem>,
    pub pagination: PaginationInfo,
}

// 审核通过后的结果
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct ApprovalResponse {
    pub request: EnrollmentRequest,
    pub enrollment: Enrollment,
}

// 直接选课结果
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/enrollment.ts")]
pub struct EnrollStudentsResponse {
    pub enrolled: Vec<Enrollment>,
}
