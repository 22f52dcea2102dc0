//! 选课申请存储操作
//!
//! 审核通过时，申请状态变更与选课记录写入在同一事务内完成。

use std::collections::HashMap;

use super::{SeaOrmStorage, page_and_size};
use crate::entity::courses::{Column as CourseColumn, Entity as Courses};
use crate::entity::enrollment_requests::{
    ActiveModel, Column, Entity as EnrollmentRequests, Model, pending_key,
};
use crate::entity::profiles::Entity as Profiles;
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    courses::entities::Course,
    enrollments::{
        entities::{EnrollmentRequest, EnrollmentRequestStatus},
        requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
        responses::{ApprovalResponse, EnrollmentRequestItem, EnrollmentRequestListResponse},
    },
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, SqlErr, TransactionTrait,
};

fn request_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::EnrollmentRequests, kind, model.id)
        .key("student_id", model.student_id)
        .key("course_id", model.course_id)
}

impl SeaOrmStorage {
    /// 学生提交选课申请
    ///
    /// 已有效选课、已有待审核申请或曾被拒绝时拒绝重复提交；
    /// 已批准但后来退课的学生可以重新申请。
    /// 并发提交由待审核唯一键兜底，后到者得到冲突错误。
    pub async fn create_enrollment_request_impl(
        &self,
        student_id: i64,
        req: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest> {
        let course_exists = Courses::find_by_id(req.course_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?
            .is_some();
        if !course_exists {
            return Err(CourseHubError::not_found("Course not found"));
        }

        if Self::find_active_enrollment(&self.db, student_id, req.course_id)
            .await?
            .is_some()
        {
            return Err(CourseHubError::conflict("Already enrolled in this course"));
        }

        let previous = EnrollmentRequests::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(req.course_id))
            .filter(Column::Status.is_in([
                EnrollmentRequestStatus::Pending.to_string(),
                EnrollmentRequestStatus::Rejected.to_string(),
            ]))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课申请失败: {e}")))?;
        if let Some(previous) = previous {
            return Err(
                if previous.status == EnrollmentRequestStatus::Pending.to_string() {
                    CourseHubError::conflict("Enrollment request is already pending")
                } else {
                    CourseHubError::conflict("Already requested enrollment for this course")
                },
            );
        }

        let message = req
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let model = ActiveModel {
            student_id: Set(student_id),
            course_id: Set(req.course_id),
            request_date: Set(chrono::Utc::now().timestamp()),
            status: Set(EnrollmentRequestStatus::Pending.to_string()),
            message: Set(message),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            pending_key: Set(Some(pending_key(student_id, req.course_id))),
            ..Default::default()
        };

        let result = model.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                CourseHubError::conflict("Enrollment request is already pending")
            }
            _ => CourseHubError::database_operation(format!("创建选课申请失败: {e}")),
        })?;

        self.changes.publish(request_event(ChangeKind::Insert, &result));
        Ok(result.into_enrollment_request())
    }

    pub async fn get_enrollment_request_by_id_impl(
        &self,
        request_id: i64,
    ) -> Result<Option<EnrollmentRequest>> {
        let result = EnrollmentRequests::find_by_id(request_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课申请失败: {e}")))?;

        Ok(result.map(|m| m.into_enrollment_request()))
    }

    /// 分页列出选课申请，附带学生与课程信息
    pub async fn list_enrollment_requests_with_pagination_impl(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = EnrollmentRequests::find();

        if let Some(course_id) = query.course_id {
            select = select.filter(Column::CourseId.eq(course_id));
        }
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }
        if let Some(lecturer_id) = query.lecturer_id {
            let taught = Courses::find()
                .select_only()
                .column(CourseColumn::Id)
                .filter(CourseColumn::LecturerId.eq(lecturer_id))
                .into_query();
            select = select.filter(Column::CourseId.in_subquery(taught));
        }

        select = select
            .order_by_desc(Column::RequestDate)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator.num_items().await.map_err(|e| {
            CourseHubError::database_operation(format!("查询选课申请总数失败: {e}"))
        })?;
        let pages = paginator.num_pages().await.map_err(|e| {
            CourseHubError::database_operation(format!("查询选课申请页数失败: {e}"))
        })?;
        let requests = paginator.fetch_page(page - 1).await.map_err(|e| {
            CourseHubError::database_operation(format!("查询选课申请列表失败: {e}"))
        })?;

        let mut courses: HashMap<i64, Option<Course>> = HashMap::new();
        let mut items = Vec::with_capacity(requests.len());
        for request in requests {
            let student = Profiles::find_by_id(request.student_id)
                .one(&self.db)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询学生失败: {e}")))?
                .map(|m| m.into_profile());

            let course = match courses.get(&request.course_id) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.get_course_by_id_impl(request.course_id).await?;
                    courses.insert(request.course_id, loaded.clone());
                    loaded
                }
            };

            items.push(EnrollmentRequestItem {
                request: request.into_enrollment_request(),
                student,
                course,
            });
        }

        Ok(EnrollmentRequestListResponse {
            items,
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 批准选课申请
    ///
    /// 状态变更与选课记录在同一事务内写入，任一步失败则整体回滚。
    /// 同一 (学生, 课程) 的其他待审核申请一并批准。
    pub async fn approve_enrollment_request_impl(
        &self,
        request_id: i64,
        reviewer_id: i64,
    ) -> Result<ApprovalResponse> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let existing = EnrollmentRequests::find_by_id(request_id)
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课申请失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Enrollment request not found"))?;

        let status = existing
            .status
            .parse::<EnrollmentRequestStatus>()
            .map_err(CourseHubError::database_operation)?
            .review(true)?;

        let (student_id, course_id) = (existing.student_id, existing.course_id);
        let mut active: ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_at = Set(Some(now));
        active.pending_key = Set(None);
        let request = active
            .update(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新选课申请失败: {e}")))?;

        let (enrollment, enrollment_event) =
            Self::upsert_active_enrollment(&txn, student_id, course_id, now).await?;
        let swept =
            Self::approve_pending_requests(&txn, student_id, course_id, reviewer_id, now).await?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        let mut events = vec![request_event(ChangeKind::Update, &request)];
        events.extend(enrollment_event);
        events.extend(swept);
        self.changes.publish_all(events);

        Ok(ApprovalResponse {
            request: request.into_enrollment_request(),
            enrollment: enrollment.into_enrollment(),
        })
    }

    /// 拒绝选课申请
    pub async fn reject_enrollment_request_impl(
        &self,
        request_id: i64,
        reviewer_id: i64,
    ) -> Result<EnrollmentRequest> {
        let existing = EnrollmentRequests::find_by_id(request_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课申请失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Enrollment request not found"))?;

        let status = existing
            .status
            .parse::<EnrollmentRequestStatus>()
            .map_err(CourseHubError::database_operation)?
            .review(false)?;

        let mut active: ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_at = Set(Some(chrono::Utc::now().timestamp()));
        active.pending_key = Set(None);
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新选课申请失败: {e}")))?;

        self.changes.publish(request_event(ChangeKind::Update, &updated));
        Ok(updated.into_enrollment_request())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        enrollments::{
            entities::{EnrollmentRequestStatus, EnrollmentStatus},
            requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
        },
        profiles::entities::UserRole,
    };
    use crate::realtime::ChangeTable;

    fn request_for(course_id: i64) -> CreateEnrollmentRequest {
        CreateEnrollmentRequest {
            course_id,
            message: Some("  Please let me in  ".into()),
        }
    }

    #[tokio::test]
    async fn test_approve_enrolls_and_publishes() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let request = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap();
        assert_eq!(request.status, EnrollmentRequestStatus::Pending);
        assert_eq!(request.message.as_deref(), Some("Please let me in"));

        let mut enrollments = storage.changes.subscribe(ChangeTable::Enrollments);
        let approved = storage
            .approve_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap();
        assert_eq!(approved.request.status, EnrollmentRequestStatus::Approved);
        assert_eq!(approved.request.reviewed_by, Some(lecturer.id()));
        assert!(approved.request.reviewed_at.is_some());
        assert_eq!(approved.enrollment.status, EnrollmentStatus::Active);
        assert_eq!(approved.enrollment.student_id, student.id());

        let event = enrollments.try_recv().unwrap();
        assert_eq!(event.id, approved.enrollment.id);
    }

    #[tokio::test]
    async fn test_reviewed_request_cannot_be_reviewed_again() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let request = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap();
        let rejected = storage
            .reject_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap();
        assert_eq!(rejected.status, EnrollmentRequestStatus::Rejected);

        let err = storage
            .approve_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E014");
        // 失败的审核不会留下选课记录
        assert!(
            storage
                .get_active_enrollment_impl(student.id(), course.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_requests_are_rejected() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let request = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap();
        let pending = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap_err();
        assert_eq!(pending.message(), "Enrollment request is already pending");

        storage
            .approve_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap();
        let enrolled = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap_err();
        assert_eq!(enrolled.message(), "Already enrolled in this course");

        // 退课后可重新申请
        storage
            .unenroll_student_impl(course.id, student.id())
            .await
            .unwrap();
        assert!(
            storage
                .create_enrollment_request_impl(student.id(), request_for(course.id))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_concurrent_submissions_leave_one_pending() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let (a, b) = tokio::join!(
            storage.create_enrollment_request_impl(student.id(), request_for(course.id)),
            storage.create_enrollment_request_impl(student.id(), request_for(course.id)),
        );
        let (created, refused): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
        assert_eq!(created.len(), 1);
        let err = refused.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.code(), "E010");

        let request = created.into_iter().next().unwrap().unwrap();
        storage
            .approve_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap();

        let pending = storage
            .list_enrollment_requests_with_pagination_impl(EnrollmentRequestListQuery {
                student_id: Some(student.id()),
                course_id: Some(course.id),
                status: Some(EnrollmentRequestStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.pagination.total, 0);
        assert!(
            storage
                .get_active_enrollment_impl(student.id(), course.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_approval_settles_every_pending_request_for_pair() {
        use crate::entity::enrollment_requests::ActiveModel;
        use sea_orm::{ActiveModelTrait, Set};

        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let request = storage
            .create_enrollment_request_impl(student.id(), request_for(course.id))
            .await
            .unwrap();
        // 没有待审核唯一键的旧数据
        let stray = ActiveModel {
            student_id: Set(student.id()),
            course_id: Set(course.id),
            request_date: Set(0),
            status: Set(EnrollmentRequestStatus::Pending.to_string()),
            message: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            pending_key: Set(None),
            ..Default::default()
        }
        .insert(&storage.db)
        .await
        .unwrap();

        storage
            .approve_enrollment_request_impl(request.id, lecturer.id())
            .await
            .unwrap();

        let stray = storage
            .get_enrollment_request_by_id_impl(stray.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stray.status, EnrollmentRequestStatus::Approved);
        assert_eq!(stray.reviewed_by, Some(lecturer.id()));
    }

    #[tokio::test]
    async fn test_missing_request_and_course() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;

        let err = storage
            .approve_enrollment_request_impl(999, lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");

        let err = storage
            .create_enrollment_request_impl(student.id(), request_for(999))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");
    }

    #[tokio::test]
    async fn test_lecturer_sees_only_own_course_requests() {
        let storage = test_support::storage().await;
        let lee = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let kim = test_support::user(&storage, "Kim", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let mine = test_support::course(&storage, "CS101", lee.id()).await;
        let theirs = test_support::course(&storage, "CS102", kim.id()).await;

        for course_id in [mine.id, theirs.id] {
            storage
                .create_enrollment_request_impl(student.id(), request_for(course_id))
                .await
                .unwrap();
        }

        let listed = storage
            .list_enrollment_requests_with_pagination_impl(EnrollmentRequestListQuery {
                lecturer_id: Some(lee.id()),
                status: Some(EnrollmentRequestStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.pagination.total, 1);
        let item = &listed.items[0];
        assert_eq!(item.request.course_id, mine.id);
        assert_eq!(
            item.student.as_ref().map(|s| s.full_name.as_str()),
            Some("Sam")
        );
        assert_eq!(
            item.course.as_ref().map(|c| c.course_code.as_str()),
            Some("CS101")
        );
    }
}
