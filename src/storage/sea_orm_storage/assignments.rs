//! 作业存储操作

use super::{SeaOrmStorage, page_and_size};
use crate::entity::assignments::{ActiveModel, Column, Entity as Assignments, Model};
use crate::entity::courses::{Column as CourseColumn, Entity as Courses};
use crate::entity::enrollments::{Column as EnrollmentColumn, Entity as Enrollments};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    assignments::{
        entities::Assignment,
        requests::{AssignmentListQuery, CreateAssignmentRequest},
        responses::AssignmentListResponse,
    },
    enrollments::entities::EnrollmentStatus,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set,
};

const DEFAULT_MAX_POINTS: f64 = 100.0;

fn assignment_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Assignments, kind, model.id).key("course_id", model.course_id)
}

impl SeaOrmStorage {
    pub async fn create_assignment_impl(
        &self,
        course_id: i64,
        instructor_id: i64,
        req: CreateAssignmentRequest,
    ) -> Result<Assignment> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(CourseHubError::validation("Assignment title is required"));
        }
        let max_points = req.max_points.unwrap_or(DEFAULT_MAX_POINTS);
        if !max_points.is_finite() || max_points <= 0.0 {
            return Err(CourseHubError::validation(
                "Maximum points must be greater than zero",
            ));
        }

        let now = chrono::Utc::now().timestamp();
        let model = ActiveModel {
            course_id: Set(course_id),
            instructor_id: Set(Some(instructor_id)),
            title: Set(title),
            description: Set(req.description),
            assignment_type: Set(req.assignment_type.to_string()),
            max_points: Set(max_points),
            due_date: Set(req.due_date.timestamp()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建作业失败: {e}")))?;

        self.changes
            .publish(assignment_event(ChangeKind::Insert, &result));
        Ok(result.into_assignment())
    }

    pub async fn get_assignment_by_id_impl(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        let result = Assignments::find_by_id(assignment_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询作业失败: {e}")))?;

        Ok(result.map(|m| m.into_assignment()))
    }

    /// 分页列出作业
    ///
    /// 指定 due_after 时只返回未到期作业并按截止时间升序，否则按截止时间倒序。
    pub async fn list_assignments_with_pagination_impl(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = Assignments::find();

        if let Some(course_id) = query.course_id {
            select = select.filter(Column::CourseId.eq(course_id));
        }
        if let Some(assignment_type) = query.assignment_type {
            select = select.filter(Column::AssignmentType.eq(assignment_type.to_string()));
        }
        if let Some(student_id) = query.enrolled_student_id {
            let enrolled = Enrollments::find()
                .select_only()
                .column(EnrollmentColumn::CourseId)
                .filter(EnrollmentColumn::StudentId.eq(student_id))
                .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
                .into_query();
            select = select.filter(Column::CourseId.in_subquery(enrolled));
        }
        if let Some(lecturer_id) = query.lecturer_id {
            let taught = Courses::find()
                .select_only()
                .column(CourseColumn::Id)
                .filter(CourseColumn::LecturerId.eq(lecturer_id))
                .into_query();
            select = select.filter(Column::CourseId.in_subquery(taught));
        }
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(Column::Title.contains(&escaped));
        }

        select = match query.due_after {
            Some(after) => select
                .filter(Column::DueDate.gt(after))
                .order_by_asc(Column::DueDate),
            None => select.order_by_desc(Column::DueDate),
        };

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询作业总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询作业页数失败: {e}")))?;
        let assignments = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询作业列表失败: {e}")))?;

        Ok(AssignmentListResponse {
            items: assignments.into_iter().map(|m| m.into_assignment()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        assignments::{
            entities::AssignmentType,
            requests::{AssignmentListQuery, CreateAssignmentRequest},
        },
        profiles::entities::UserRole,
    };

    #[tokio::test]
    async fn test_create_validates_and_defaults() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let blank = storage
            .create_assignment_impl(
                course.id,
                lecturer.id(),
                CreateAssignmentRequest {
                    title: "   ".into(),
                    description: None,
                    assignment_type: AssignmentType::Assignment,
                    max_points: None,
                    due_date: chrono::Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(blank.code(), "E007");

        let created = storage
            .create_assignment_impl(
                course.id,
                lecturer.id(),
                CreateAssignmentRequest {
                    title: "Essay".into(),
                    description: None,
                    assignment_type: AssignmentType::Assignment,
                    max_points: None,
                    due_date: chrono::Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.max_points, 100.0);
        assert_eq!(created.instructor_id, Some(lecturer.id()));
    }

    #[tokio::test]
    async fn test_student_sees_enrolled_course_assignments() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let a = test_support::course(&storage, "CS101", lecturer.id()).await;
        let b = test_support::course(&storage, "CS102", lecturer.id()).await;
        storage
            .enroll_students_impl(a.id, &[student.id()], lecturer.id())
            .await
            .unwrap();
        test_support::assignment(&storage, a.id, lecturer.id(), "Quiz 1", 20.0).await;
        test_support::assignment(&storage, b.id, lecturer.id(), "Quiz 2", 20.0).await;

        let visible = storage
            .list_assignments_with_pagination_impl(AssignmentListQuery {
                enrolled_student_id: Some(student.id()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(visible.items.len(), 1);
        assert_eq!(visible.items[0].title, "Quiz 1");

        let upcoming = storage
            .list_assignments_with_pagination_impl(AssignmentListQuery {
                lecturer_id: Some(lecturer.id()),
                due_after: Some(chrono::Utc::now().timestamp()),
                search: Some("quiz".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(upcoming.pagination.total, 2);

        let past = storage
            .list_assignments_with_pagination_impl(AssignmentListQuery {
                due_after: Some((chrono::Utc::now() + chrono::Duration::days(30)).timestamp()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(past.items.is_empty());
    }
}
