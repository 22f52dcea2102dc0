//! 选课申请实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "enrollment_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub request_date: i64,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<i64>,
    pub pending_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profiles::Entity",
        from = "Column::StudentId",
        to = "super::profiles::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Course,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// 待审核申请的唯一键
pub fn pending_key(student_id: i64, course_id: i64) -> String {
    format!("{student_id}:{course_id}")
}

impl Model {
    pub fn into_enrollment_request(self) -> crate::models::enrollments::entities::EnrollmentRequest {
        use crate::models::enrollments::entities::{EnrollmentRequest, EnrollmentRequestStatus};

        EnrollmentRequest {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            request_date: super::ts(self.request_date),
            status: self
                .status
                .parse::<EnrollmentRequestStatus>()
                .unwrap_or(EnrollmentRequestStatus::Pending),
            message: self.message,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at.map(super::ts),
        }
    }
}
