//! 成绩反馈存储操作

use super::{SeaOrmStorage, page_and_size};
use crate::entity::feedback::{ActiveModel, Column, Entity as FeedbackEntity, Model};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    feedback::{entities::Feedback, requests::FeedbackListQuery, responses::FeedbackListResponse},
    grades::entities::Grade,
    notifications::entities::NewNotification,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

fn feedback_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Feedback, kind, model.id)
        .key("student_id", model.student_id)
        .key("lecturer_id", model.lecturer_id)
        .key("grade_id", model.grade_id)
}

impl SeaOrmStorage {
    /// 讲师对成绩发送反馈，同一事务内通知学生
    pub async fn create_feedback_impl(
        &self,
        grade: &Grade,
        lecturer_id: i64,
        message: &str,
    ) -> Result<Feedback> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CourseHubError::validation("Feedback message is required"));
        }

        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let result = ActiveModel {
            grade_id: Set(grade.id),
            student_id: Set(grade.student_id),
            lecturer_id: Set(lecturer_id),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建反馈失败: {e}")))?;

        let notification_events = Self::insert_notifications(
            &txn,
            vec![NewNotification::feedback_received(
                result.student_id,
                result.id,
            )],
            now,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        self.changes.publish_all(
            std::iter::once(feedback_event(ChangeKind::Insert, &result)).chain(notification_events),
        );
        Ok(result.into_feedback())
    }

    pub async fn list_feedback_with_pagination_impl(
        &self,
        query: FeedbackListQuery,
    ) -> Result<FeedbackListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = FeedbackEntity::find();
        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }
        if let Some(lecturer_id) = query.lecturer_id {
            select = select.filter(Column::LecturerId.eq(lecturer_id));
        }
        if query.unread_only {
            select = select.filter(Column::IsRead.eq(false));
        }
        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询反馈总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询反馈页数失败: {e}")))?;
        let rows = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询反馈列表失败: {e}")))?;

        Ok(FeedbackListResponse {
            items: rows.into_iter().map(|m| m.into_feedback()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 学生将收到的反馈标记为已读
    pub async fn mark_feedback_read_impl(
        &self,
        feedback_id: i64,
        student_id: i64,
    ) -> Result<Option<Feedback>> {
        let Some(existing) = FeedbackEntity::find_by_id(feedback_id)
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询反馈失败: {e}")))?
        else {
            return Ok(None);
        };

        if existing.is_read {
            return Ok(Some(existing.into_feedback()));
        }

        let mut model: ActiveModel = existing.into();
        model.is_read = Set(true);
        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("标记反馈已读失败: {e}")))?;

        self.changes.publish(feedback_event(ChangeKind::Update, &updated));
        Ok(Some(updated.into_feedback()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        feedback::requests::FeedbackListQuery,
        grades::{entities::GradeStatus, requests::CreateGradeRequest},
        profiles::entities::UserRole,
    };

    #[tokio::test]
    async fn test_feedback_notifies_and_marks_read() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;
        storage
            .enroll_students_impl(course.id, &[student.id()], lecturer.id())
            .await
            .unwrap();
        let assignment =
            test_support::assignment(&storage, course.id, lecturer.id(), "Lab", 10.0).await;
        let grade = storage
            .create_grade_impl(
                CreateGradeRequest {
                    student_id: student.id(),
                    assignment_id: assignment.id,
                    marks_obtained: Some(7.0),
                    total_marks: None,
                    lecturer_comments: None,
                    status: GradeStatus::Published,
                },
                lecturer.id(),
            )
            .await
            .unwrap();

        let blank = storage
            .create_feedback_impl(&grade, lecturer.id(), "  ")
            .await
            .unwrap_err();
        assert_eq!(blank.code(), "E007");

        let feedback = storage
            .create_feedback_impl(&grade, lecturer.id(), "Check question 3")
            .await
            .unwrap();
        assert_eq!(feedback.student_id, student.id());
        assert!(!feedback.is_read);
        // 发布通知 + 反馈通知
        assert_eq!(
            storage
                .get_unread_notification_count_impl(student.id())
                .await
                .unwrap(),
            2
        );

        assert!(
            storage
                .mark_feedback_read_impl(feedback.id, lecturer.id())
                .await
                .unwrap()
                .is_none()
        );
        let read = storage
            .mark_feedback_read_impl(feedback.id, student.id())
            .await
            .unwrap()
            .unwrap();
        assert!(read.is_read);

        let unread = storage
            .list_feedback_with_pagination_impl(FeedbackListQuery {
                student_id: Some(student.id()),
                unread_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(unread.items.is_empty());

        let sent = storage
            .list_feedback_with_pagination_impl(FeedbackListQuery {
                lecturer_id: Some(lecturer.id()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sent.pagination.total, 1);
    }
}
