//! 选课记录存储操作
//!
//! 每个 (学生, 课程) 至多一条记录；再次选课时重新激活原记录。

use super::SeaOrmStorage;
use crate::entity::courses::Entity as Courses;
use crate::entity::enrollment_requests::{
    ActiveModel as RequestActiveModel, Column as RequestColumn, Entity as EnrollmentRequests,
};
use crate::entity::enrollments::{ActiveModel, Column, Entity as Enrollments, Model};
use crate::entity::profiles::Entity as Profiles;
use crate::errors::{CourseHubError, Result};
use crate::models::{
    enrollments::entities::{Enrollment, EnrollmentRequestStatus, EnrollmentStatus},
    profiles::entities::UserRole,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

pub(super) fn enrollment_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Enrollments, kind, model.id)
        .key("student_id", model.student_id)
        .key("course_id", model.course_id)
}

impl SeaOrmStorage {
    /// 插入或重新激活选课记录；已是 active 时不产生事件
    pub(super) async fn upsert_active_enrollment<C: ConnectionTrait>(
        conn: &C,
        student_id: i64,
        course_id: i64,
        now: i64,
    ) -> Result<(Model, Option<ChangeEvent>)> {
        let existing = Enrollments::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?;

        match existing {
            Some(model) if model.status == EnrollmentStatus::Active.to_string() => {
                Ok((model, None))
            }
            Some(model) => {
                let mut active: ActiveModel = model.into();
                active.status = Set(EnrollmentStatus::Active.to_string());
                active.enrollment_date = Set(now);
                let updated = active.update(conn).await.map_err(|e| {
                    CourseHubError::database_operation(format!("恢复选课记录失败: {e}"))
                })?;
                let event = enrollment_event(ChangeKind::Update, &updated);
                Ok((updated, Some(event)))
            }
            None => {
                let inserted = ActiveModel {
                    student_id: Set(student_id),
                    course_id: Set(course_id),
                    status: Set(EnrollmentStatus::Active.to_string()),
                    enrollment_date: Set(now),
                    ..Default::default()
                }
                .insert(conn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("创建选课记录失败: {e}")))?;
                let event = enrollment_event(ChangeKind::Insert, &inserted);
                Ok((inserted, Some(event)))
            }
        }
    }

    /// 将 (学生, 课程) 所有待审核申请标记为已批准并释放待审核唯一键
    pub(super) async fn approve_pending_requests<C: ConnectionTrait>(
        conn: &C,
        student_id: i64,
        course_id: i64,
        reviewer_id: i64,
        now: i64,
    ) -> Result<Vec<ChangeEvent>> {
        let pending = EnrollmentRequests::find()
            .filter(RequestColumn::StudentId.eq(student_id))
            .filter(RequestColumn::CourseId.eq(course_id))
            .filter(RequestColumn::Status.eq(EnrollmentRequestStatus::Pending.to_string()))
            .all(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课申请失败: {e}")))?;

        let mut events = Vec::with_capacity(pending.len());
        for request in pending {
            let request_id = request.id;
            let mut active: RequestActiveModel = request.into();
            active.status = Set(EnrollmentRequestStatus::Approved.to_string());
            active.reviewed_by = Set(Some(reviewer_id));
            active.reviewed_at = Set(Some(now));
            active.pending_key = Set(None);
            active.update(conn).await.map_err(|e| {
                CourseHubError::database_operation(format!("更新选课申请失败: {e}"))
            })?;
            events.push(
                ChangeEvent::new(ChangeTable::EnrollmentRequests, ChangeKind::Update, request_id)
                    .key("student_id", student_id)
                    .key("course_id", course_id),
            );
        }
        Ok(events)
    }

    /// 讲师直接选课；同一事务内批准该学生对此课程的待审核申请，审核人记为调用者
    pub async fn enroll_students_impl(
        &self,
        course_id: i64,
        student_ids: &[i64],
        reviewer_id: i64,
    ) -> Result<Vec<Enrollment>> {
        let mut ids = student_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Err(CourseHubError::validation("No students given"));
        }

        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        Courses::find_by_id(course_id)
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Course not found"))?;

        let mut enrolled = Vec::with_capacity(ids.len());
        let mut events = Vec::new();

        for student_id in ids {
            let profile = Profiles::find_by_id(student_id)
                .one(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询学生失败: {e}")))?;
            match profile {
                Some(p) if p.role == UserRole::Student.to_string() => {}
                _ => {
                    return Err(CourseHubError::validation(format!(
                        "User {student_id} is not a student"
                    )));
                }
            }

            let (model, event) =
                Self::upsert_active_enrollment(&txn, student_id, course_id, now).await?;
            events.extend(event);

            // 待审核申请随直接选课一并批准
            events.extend(
                Self::approve_pending_requests(&txn, student_id, course_id, reviewer_id, now)
                    .await?,
            );

            enrolled.push(model.into_enrollment());
        }

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;
        self.changes.publish_all(events);

        Ok(enrolled)
    }

    /// 退课：记录改为 inactive，成绩保留
    pub async fn unenroll_student_impl(&self, course_id: i64, student_id: i64) -> Result<Enrollment> {
        let existing = Enrollments::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Status.eq(EnrollmentStatus::Active.to_string()))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Student is not enrolled in this course"))?;

        let mut active: ActiveModel = existing.into();
        active.status = Set(EnrollmentStatus::Inactive.to_string());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("退课失败: {e}")))?;

        self.changes
            .publish(enrollment_event(ChangeKind::Update, &updated));
        Ok(updated.into_enrollment())
    }

    pub async fn get_active_enrollment_impl(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>> {
        Self::find_active_enrollment(&self.db, student_id, course_id)
            .await
            .map(|m| m.map(|m| m.into_enrollment()))
    }

    pub(super) async fn find_active_enrollment<C: ConnectionTrait>(
        conn: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Model>> {
        Enrollments::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Status.eq(EnrollmentStatus::Active.to_string()))
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        enrollments::{
            entities::{EnrollmentRequestStatus, EnrollmentStatus},
            requests::CreateEnrollmentRequest,
        },
        profiles::entities::UserRole,
    };

    #[tokio::test]
    async fn test_reenroll_reactivates_single_row() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let first = storage
            .enroll_students_impl(course.id, &[student.id(), student.id()], lecturer.id())
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let dropped = storage
            .unenroll_student_impl(course.id, student.id())
            .await
            .unwrap();
        assert_eq!(dropped.status, EnrollmentStatus::Inactive);
        assert!(
            storage
                .get_active_enrollment_impl(student.id(), course.id)
                .await
                .unwrap()
                .is_none()
        );

        let again = storage
            .enroll_students_impl(course.id, &[student.id()], lecturer.id())
            .await
            .unwrap();
        assert_eq!(again[0].id, first[0].id);
        assert_eq!(again[0].status, EnrollmentStatus::Active);
    }

    #[tokio::test]
    async fn test_direct_enroll_approves_pending_request() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let admin = test_support::user(&storage, "Ada", UserRole::Admin).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let request = storage
            .create_enrollment_request_impl(
                student.id(),
                CreateEnrollmentRequest {
                    course_id: course.id,
                    message: None,
                },
            )
            .await
            .unwrap();

        storage
            .enroll_students_impl(course.id, &[student.id()], admin.id())
            .await
            .unwrap();

        let reloaded = storage
            .get_enrollment_request_by_id_impl(request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, EnrollmentRequestStatus::Approved);
        assert_eq!(reloaded.reviewed_by, Some(admin.id()));
    }

    #[tokio::test]
    async fn test_enroll_rejects_non_students_atomically() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let err = storage
            .enroll_students_impl(course.id, &[student.id(), lecturer.id()], lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E007");
        // 整批回滚
        assert!(
            storage
                .get_active_enrollment_impl(student.id(), course.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unenroll_requires_active_enrollment() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;

        let err = storage
            .unenroll_student_impl(course.id, student.id())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");
    }
}
