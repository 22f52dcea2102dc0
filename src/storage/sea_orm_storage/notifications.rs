//! 通知存储操作
//!
//! 通知只由业务写操作产生（成绩发布/修改、反馈、公告），
//! 与触发它的写操作在同一事务内插入。

use super::{SeaOrmStorage, page_and_size};
use crate::entity::notifications::{ActiveModel, Column, Entity as Notifications, Model};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    notifications::{
        entities::{NewNotification, Notification},
        requests::NotificationListQuery,
        responses::NotificationListResponse,
    },
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

fn notification_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Notifications, kind, model.id).key("user_id", model.user_id)
}

impl SeaOrmStorage {
    /// 插入一批通知，返回提交后需要发布的事件
    pub(super) async fn insert_notifications<C: ConnectionTrait>(
        conn: &C,
        notifications: Vec<NewNotification>,
        now: i64,
    ) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::with_capacity(notifications.len());

        for n in notifications {
            let model = ActiveModel {
                user_id: Set(n.user_id),
                title: Set(n.title),
                message: Set(n.message),
                notification_type: Set(n.notification_type.to_string()),
                related_id: Set(n.related_id),
                is_read: Set(false),
                is_email_sent: Set(false),
                created_at: Set(now),
                ..Default::default()
            };

            let result = model
                .insert(conn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("创建通知失败: {e}")))?;
            events.push(notification_event(ChangeKind::Insert, &result));
        }

        Ok(events)
    }

    /// 列出用户通知（分页，新的在前）
    pub async fn list_notifications_with_pagination_impl(
        &self,
        user_id: i64,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = Notifications::find().filter(Column::UserId.eq(user_id));

        if let Some(is_read) = query.is_read {
            select = select.filter(Column::IsRead.eq(is_read));
        }
        if let Some(notification_type) = query.notification_type {
            select = select.filter(Column::NotificationType.eq(notification_type.to_string()));
        }

        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知页数失败: {e}")))?;

        let notifications = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知列表失败: {e}")))?;

        let unread_count = self.get_unread_notification_count_impl(user_id).await?;

        Ok(NotificationListResponse {
            items: notifications
                .into_iter()
                .map(|m| m.into_notification())
                .collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
            unread_count,
        })
    }

    /// 获取用户未读通知数量
    pub async fn get_unread_notification_count_impl(&self, user_id: i64) -> Result<i64> {
        let count = Notifications::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::IsRead.eq(false))
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询未读通知数量失败: {e}")))?;

        Ok(count as i64)
    }

    /// 标记本人通知为已读；不存在或不属于本人时返回 None
    pub async fn mark_notification_read_impl(
        &self,
        notification_id: i64,
        user_id: i64,
    ) -> Result<Option<Notification>> {
        let Some(existing) = Notifications::find_by_id(notification_id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知失败: {e}")))?
        else {
            return Ok(None);
        };

        if existing.is_read {
            return Ok(Some(existing.into_notification()));
        }

        let mut model: ActiveModel = existing.into();
        model.is_read = Set(true);
        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("标记通知已读失败: {e}")))?;

        self.changes
            .publish(notification_event(ChangeKind::Update, &updated));
        Ok(Some(updated.into_notification()))
    }

    /// 标记用户所有通知为已读
    pub async fn mark_all_notifications_read_impl(&self, user_id: i64) -> Result<i64> {
        let result = Notifications::update_many()
            .col_expr(Column::IsRead, sea_orm::sea_query::Expr::value(true))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::IsRead.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("标记全部通知已读失败: {e}")))?;

        Ok(result.rows_affected as i64)
    }

    /// 删除本人通知
    pub async fn delete_notification_impl(&self, notification_id: i64, user_id: i64) -> Result<bool> {
        let result = Notifications::delete_many()
            .filter(Column::Id.eq(notification_id))
            .filter(Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("删除通知失败: {e}")))?;

        if result.rows_affected > 0 {
            self.changes.publish(
                ChangeEvent::new(ChangeTable::Notifications, ChangeKind::Delete, notification_id)
                    .key("user_id", user_id),
            );
        }
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SeaOrmStorage, test_support};
    use crate::models::{
        notifications::{
            entities::{NewNotification, NotificationType},
            requests::NotificationListQuery,
        },
        profiles::entities::UserRole,
    };

    async fn seed(storage: &SeaOrmStorage, user_id: i64) {
        let events = SeaOrmStorage::insert_notifications(
            &storage.db,
            vec![
                NewNotification::grade_published(user_id, 1, "Quiz 1"),
                NewNotification::feedback_received(user_id, 2),
            ],
            chrono::Utc::now().timestamp(),
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_unread_count_and_mark_all() {
        let storage = test_support::storage().await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        seed(&storage, student.id()).await;

        assert_eq!(
            storage
                .get_unread_notification_count_impl(student.id())
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            storage
                .mark_all_notifications_read_impl(student.id())
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            storage
                .get_unread_notification_count_impl(student.id())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_only_owner_can_touch_notification() {
        let storage = test_support::storage().await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let other = test_support::user(&storage, "Amy", UserRole::Student).await;
        seed(&storage, student.id()).await;

        let listed = storage
            .list_notifications_with_pagination_impl(
                student.id(),
                NotificationListQuery {
                    notification_type: Some(NotificationType::FeedbackReceived),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.items.len(), 1);
        let id = listed.items[0].id;

        assert!(
            storage
                .mark_notification_read_impl(id, other.id())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!storage.delete_notification_impl(id, other.id()).await.unwrap());

        let read = storage
            .mark_notification_read_impl(id, student.id())
            .await
            .unwrap()
            .unwrap();
        assert!(read.is_read);

        let unread = storage
            .list_notifications_with_pagination_impl(
                student.id(),
                NotificationListQuery {
                    is_read: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.pagination.total, 1);
        assert_eq!(unread.unread_count, 1);

        assert!(storage.delete_notification_impl(id, student.id()).await.unwrap());
    }
}
