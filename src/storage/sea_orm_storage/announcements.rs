//! 课程公告存储操作

use super::{SeaOrmStorage, page_and_size};
use crate::entity::announcements::{ActiveModel, Column, Entity as Announcements, Model};
use crate::entity::courses::Entity as Courses;
use crate::entity::enrollments::{Column as EnrollmentColumn, Entity as Enrollments};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    announcements::{
        entities::Announcement, requests::CreateAnnouncementRequest,
        responses::AnnouncementListResponse,
    },
    enrollments::entities::EnrollmentStatus,
    notifications::entities::NewNotification,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

fn announcement_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Announcements, kind, model.id).key("course_id", model.course_id)
}

impl SeaOrmStorage {
    // 给课程全部有效选课学生生成公告通知
    async fn announcement_notifications<C: ConnectionTrait>(
        conn: &C,
        announcement: &Model,
    ) -> Result<Vec<NewNotification>> {
        let course = Courses::find_by_id(announcement.course_id)
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Course not found"))?;

        let students: Vec<i64> = Enrollments::find()
            .select_only()
            .column(EnrollmentColumn::StudentId)
            .filter(EnrollmentColumn::CourseId.eq(announcement.course_id))
            .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课学生失败: {e}")))?;

        Ok(students
            .into_iter()
            .map(|student_id| {
                NewNotification::announcement(
                    student_id,
                    announcement.id,
                    &course.course_code,
                    &announcement.title,
                )
            })
            .collect())
    }

    pub async fn create_announcement_impl(
        &self,
        course_id: i64,
        created_by: i64,
        req: CreateAnnouncementRequest,
    ) -> Result<Announcement> {
        let title = req.title.trim().to_string();
        let content = req.content.trim().to_string();
        if title.is_empty() || content.is_empty() {
            return Err(CourseHubError::validation(
                "Announcement title and content are required",
            ));
        }

        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let result = ActiveModel {
            course_id: Set(course_id),
            title: Set(title),
            content: Set(content),
            created_by: Set(Some(created_by)),
            is_published: Set(req.publish),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建公告失败: {e}")))?;

        let notifications = if result.is_published {
            Self::announcement_notifications(&txn, &result).await?
        } else {
            Vec::new()
        };
        let notification_events = Self::insert_notifications(&txn, notifications, now).await?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        self.changes.publish_all(
            std::iter::once(announcement_event(ChangeKind::Insert, &result))
                .chain(notification_events),
        );
        Ok(result.into_announcement())
    }

    pub async fn get_announcement_by_id_impl(
        &self,
        announcement_id: i64,
    ) -> Result<Option<Announcement>> {
        let result = Announcements::find_by_id(announcement_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询公告失败: {e}")))?;

        Ok(result.map(|m| m.into_announcement()))
    }

    /// 发布草稿公告并通知选课学生
    pub async fn publish_announcement_impl(&self, announcement_id: i64) -> Result<Announcement> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let existing = Announcements::find_by_id(announcement_id)
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询公告失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Announcement not found"))?;
        if existing.is_published {
            return Err(CourseHubError::invalid_transition(
                "Announcement is already published",
            ));
        }

        let mut model: ActiveModel = existing.into();
        model.is_published = Set(true);
        model.updated_at = Set(now);
        let updated = model
            .update(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("发布公告失败: {e}")))?;

        let notifications = Self::announcement_notifications(&txn, &updated).await?;
        let notification_events = Self::insert_notifications(&txn, notifications, now).await?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        self.changes.publish_all(
            std::iter::once(announcement_event(ChangeKind::Update, &updated))
                .chain(notification_events),
        );
        Ok(updated.into_announcement())
    }

    /// 课程公告列表（新的在前）；include_drafts 为假时只返回已发布的
    pub async fn list_announcements_with_pagination_impl(
        &self,
        course_id: i64,
        include_drafts: bool,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<AnnouncementListResponse> {
        let (page, size) = page_and_size(page, size);

        let mut select = Announcements::find().filter(Column::CourseId.eq(course_id));
        if !include_drafts {
            select = select.filter(Column::IsPublished.eq(true));
        }
        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询公告总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询公告页数失败: {e}")))?;
        let rows = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询公告列表失败: {e}")))?;

        Ok(AnnouncementListResponse {
            items: rows.into_iter().map(|m| m.into_announcement()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        announcements::requests::CreateAnnouncementRequest, profiles::entities::UserRole,
    };

    #[tokio::test]
    async fn test_draft_announcement_publishes_once() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;
        storage
            .enroll_students_impl(course.id, &[student.id()], lecturer.id())
            .await
            .unwrap();

        let draft = storage
            .create_announcement_impl(
                course.id,
                lecturer.id(),
                CreateAnnouncementRequest {
                    title: "Room change".into(),
                    content: "Lab moves to B12".into(),
                    publish: false,
                },
            )
            .await
            .unwrap();
        assert!(!draft.is_published);
        assert_eq!(
            storage
                .get_unread_notification_count_impl(student.id())
                .await
                .unwrap(),
            0
        );
        let public = storage
            .list_announcements_with_pagination_impl(course.id, false, None, None)
            .await
            .unwrap();
        assert!(public.items.is_empty());

        let published = storage.publish_announcement_impl(draft.id).await.unwrap();
        assert!(published.is_published);
        assert_eq!(
            storage
                .get_unread_notification_count_impl(student.id())
                .await
                .unwrap(),
            1
        );

        let again = storage
            .publish_announcement_impl(draft.id)
            .await
            .unwrap_err();
        assert_eq!(again.code(), "E014");

        let all = storage
            .list_announcements_with_pagination_impl(course.id, true, None, None)
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_listing_through_storage_trait_pages() {
        use crate::storage::Storage;

        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;
        for title in ["Week 1", "Week 2", "Week 3"] {
            storage
                .create_announcement_impl(
                    course.id,
                    lecturer.id(),
                    CreateAnnouncementRequest {
                        title: title.into(),
                        content: "Slides are up".into(),
                        publish: true,
                    },
                )
                .await
                .unwrap();
        }

        let page = storage
            .list_announcements_with_pagination(course.id, false, 2, 2)
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.items.len(), 1);
        assert!(!page.pagination.has_next());
    }
}
