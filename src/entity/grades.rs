//! 成绩实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub assignment_id: i64,
    pub marks_obtained: Option<f64>,
    pub total_marks: f64,
    pub percentage: Option<f64>,
    pub grade_letter: Option<String>,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub lecturer_comments: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
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
    #[sea_orm(
        belongs_to = "super::assignments::Entity",
        from = "Column::AssignmentId",
        to = "super::assignments::Column::Id"
    )]
    Assignment,
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

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_grade(self) -> crate::models::grades::entities::Grade {
        use crate::models::grades::entities::{Grade, GradeStatus};

        Grade {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            assignment_id: self.assignment_id,
            marks_obtained: self.marks_obtained,
            total_marks: self.total_marks,
            percentage: self.percentage,
            grade_letter: self.grade_letter,
            status: self.status.parse::<GradeStatus>().unwrap_or(GradeStatus::Draft),
            lecturer_comments: self.lecturer_comments,
            graded_by: self.graded_by,
            graded_at: self.graded_at.map(super::ts),
            created_at: super::ts(self.created_at),
            updated_at: super::ts(self.updated_at),
        }
    }
}
