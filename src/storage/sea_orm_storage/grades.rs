//! 成绩存储操作
//!
//! 成绩写入与对应的学生通知在同一事务内完成；
//! 百分比与等级在每次写入时重新计算。

use std::collections::{HashMap, HashSet};

use super::{SeaOrmStorage, page_and_size};
use crate::entity::assignments::{
    Column as AssignmentColumn, Entity as Assignments, Model as AssignmentModel,
};
use crate::entity::courses::{Column as CourseColumn, Entity as Courses};
use crate::entity::enrollments::{Column as EnrollmentColumn, Entity as Enrollments};
use crate::entity::grades::{ActiveModel, Column, Entity as Grades, Model};
use crate::entity::profiles::Entity as Profiles;
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    dashboard::responses::DashboardStats,
    enrollments::entities::EnrollmentStatus,
    grades::{
        entities::{DerivedScore, Grade, GradeStatus, validate_marks},
        requests::{BulkGradeRequest, CreateGradeRequest, GradeListQuery, UpdateGradeRequest},
        responses::{BulkGradeResponse, GradeListItem, GradeListResponse},
    },
    notifications::entities::NewNotification,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};

fn grade_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    ChangeEvent::new(ChangeTable::Grades, kind, model.id)
        .key("student_id", model.student_id)
        .key("course_id", model.course_id)
        .key("assignment_id", model.assignment_id)
}

fn clean_comments(comments: Option<String>) -> Option<String> {
    comments
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn parse_status(model: &Model) -> Result<GradeStatus> {
    model
        .status
        .parse::<GradeStatus>()
        .map_err(CourseHubError::database_operation)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

// 新成绩的字段
struct NewGrade {
    student_id: i64,
    marks_obtained: Option<f64>,
    total_marks: f64,
    lecturer_comments: Option<String>,
    status: GradeStatus,
}

impl SeaOrmStorage {
    async fn load_assignment<C: ConnectionTrait>(
        conn: &C,
        assignment_id: i64,
    ) -> Result<AssignmentModel> {
        Assignments::find_by_id(assignment_id)
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询作业失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Assignment not found"))
    }

    async fn load_grade<C: ConnectionTrait>(conn: &C, grade_id: i64) -> Result<Model> {
        Grades::find_by_id(grade_id)
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Grade not found"))
    }

    async fn find_grade_for<C: ConnectionTrait>(
        conn: &C,
        student_id: i64,
        assignment_id: i64,
    ) -> Result<Option<Model>> {
        Grades::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::AssignmentId.eq(assignment_id))
            .one(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩失败: {e}")))
    }

    async fn ensure_enrolled<C: ConnectionTrait>(
        conn: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<()> {
        match Self::find_active_enrollment(conn, student_id, course_id).await? {
            Some(_) => Ok(()),
            None => Err(CourseHubError::validation(format!(
                "Student {student_id} is not enrolled in this course"
            ))),
        }
    }

    /// 插入新成绩；发布状态时附带 grade_published 通知
    async fn insert_grade<C: ConnectionTrait>(
        conn: &C,
        assignment: &AssignmentModel,
        grade: NewGrade,
        graded_by: i64,
        now: i64,
        notifications: &mut Vec<NewNotification>,
    ) -> Result<Model> {
        let status = grade.status.ensure_initial()?;
        validate_marks(grade.marks_obtained, grade.total_marks)?;
        let derived = DerivedScore::compute(grade.marks_obtained, grade.total_marks);
        let published = status == GradeStatus::Published;

        let model = ActiveModel {
            student_id: Set(grade.student_id),
            course_id: Set(assignment.course_id),
            assignment_id: Set(assignment.id),
            marks_obtained: Set(grade.marks_obtained),
            total_marks: Set(grade.total_marks),
            percentage: Set(derived.percentage),
            grade_letter: Set(derived.grade_letter),
            status: Set(status.to_string()),
            lecturer_comments: Set(grade.lecturer_comments),
            graded_by: Set(Some(graded_by)),
            graded_at: Set(published.then_some(now)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建成绩失败: {e}")))?;

        if published {
            notifications.push(NewNotification::grade_published(
                result.student_id,
                result.id,
                &assignment.title,
            ));
        }
        Ok(result)
    }

    /// 修改已有成绩的分数与评语
    ///
    /// `publish` 为真且原成绩为草稿时同时发布；已发布的成绩转为 revised 并通知学生。
    #[allow(clippy::too_many_arguments)]
    async fn edit_grade<C: ConnectionTrait>(
        conn: &C,
        existing: Model,
        assignment_title: &str,
        marks_obtained: Option<f64>,
        total_marks: f64,
        lecturer_comments: Option<Option<String>>,
        publish: Option<i64>,
        now: i64,
        notifications: &mut Vec<NewNotification>,
    ) -> Result<Model> {
        validate_marks(marks_obtained, total_marks)?;

        let previous = parse_status(&existing)?;
        let next = match (previous, publish) {
            (GradeStatus::Draft, Some(_)) => GradeStatus::Published,
            (status, _) => status.after_edit(),
        };
        let derived = DerivedScore::compute(marks_obtained, total_marks);

        let mut model: ActiveModel = existing.into();
        model.marks_obtained = Set(marks_obtained);
        model.total_marks = Set(total_marks);
        model.percentage = Set(derived.percentage);
        model.grade_letter = Set(derived.grade_letter);
        model.status = Set(next.to_string());
        if let Some(comments) = lecturer_comments {
            model.lecturer_comments = Set(comments);
        }
        if let (GradeStatus::Published, Some(by)) = (next, publish) {
            model.graded_by = Set(Some(by));
            model.graded_at = Set(Some(now));
        }
        model.updated_at = Set(now);

        let updated = model
            .update(conn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新成绩失败: {e}")))?;

        match (previous, next) {
            (GradeStatus::Draft, GradeStatus::Published) => notifications.push(
                NewNotification::grade_published(updated.student_id, updated.id, assignment_title),
            ),
            (GradeStatus::Published | GradeStatus::Revised, _) => notifications.push(
                NewNotification::grade_updated(updated.student_id, updated.id, assignment_title),
            ),
            _ => {}
        }
        Ok(updated)
    }

    /// 提交事务并发布成绩与通知事件
    async fn commit_grades(
        &self,
        txn: sea_orm::DatabaseTransaction,
        grades: Vec<(ChangeKind, &Model)>,
        notifications: Vec<NewNotification>,
        now: i64,
    ) -> Result<()> {
        let notification_events = Self::insert_notifications(&txn, notifications, now).await?;
        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        self.changes.publish_all(
            grades
                .into_iter()
                .map(|(kind, model)| grade_event(kind, model))
                .chain(notification_events),
        );
        Ok(())
    }

    /// 为单个学生评分
    pub async fn create_grade_impl(&self, req: CreateGradeRequest, graded_by: i64) -> Result<Grade> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let assignment = Self::load_assignment(&txn, req.assignment_id).await?;
        Self::ensure_enrolled(&txn, req.student_id, assignment.course_id).await?;
        if Self::find_grade_for(&txn, req.student_id, assignment.id)
            .await?
            .is_some()
        {
            return Err(CourseHubError::conflict(
                "Grade already exists for this student and assignment",
            ));
        }

        let mut notifications = Vec::new();
        let created = Self::insert_grade(
            &txn,
            &assignment,
            NewGrade {
                student_id: req.student_id,
                marks_obtained: req.marks_obtained,
                total_marks: req.total_marks.unwrap_or(assignment.max_points),
                lecturer_comments: clean_comments(req.lecturer_comments),
                status: req.status,
            },
            graded_by,
            now,
            &mut notifications,
        )
        .await?;

        self.commit_grades(txn, vec![(ChangeKind::Insert, &created)], notifications, now)
            .await?;
        Ok(created.into_grade())
    }

    /// 快速录入：同一作业的多名学生在一个事务内保存
    pub async fn bulk_save_grades_impl(
        &self,
        req: BulkGradeRequest,
        graded_by: i64,
    ) -> Result<BulkGradeResponse> {
        let status = req.status.ensure_initial()?;
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let assignment = Self::load_assignment(&txn, req.assignment_id).await?;

        let mut saved: Vec<(ChangeKind, Model)> = Vec::new();
        let mut skipped = Vec::new();
        let mut notifications = Vec::new();
        let mut seen = HashSet::new();

        for entry in req.entries {
            if !entry.has_marks() || !seen.insert(entry.student_id) {
                skipped.push(entry.student_id);
                continue;
            }
            Self::ensure_enrolled(&txn, entry.student_id, assignment.course_id).await?;

            let comments = clean_comments(entry.lecturer_comments);
            match Self::find_grade_for(&txn, entry.student_id, assignment.id).await? {
                Some(existing) => {
                    let total = existing.total_marks;
                    let updated = Self::edit_grade(
                        &txn,
                        existing,
                        &assignment.title,
                        entry.marks_obtained,
                        total,
                        comments.map(Some),
                        (status == GradeStatus::Published).then_some(graded_by),
                        now,
                        &mut notifications,
                    )
                    .await?;
                    saved.push((ChangeKind::Update, updated));
                }
                None => {
                    let created = Self::insert_grade(
                        &txn,
                        &assignment,
                        NewGrade {
                            student_id: entry.student_id,
                            marks_obtained: entry.marks_obtained,
                            total_marks: assignment.max_points,
                            lecturer_comments: comments,
                            status,
                        },
                        graded_by,
                        now,
                        &mut notifications,
                    )
                    .await?;
                    saved.push((ChangeKind::Insert, created));
                }
            }
        }

        self.commit_grades(
            txn,
            saved.iter().map(|(kind, model)| (*kind, model)).collect(),
            notifications,
            now,
        )
        .await?;

        Ok(BulkGradeResponse {
            saved: saved.into_iter().map(|(_, m)| m.into_grade()).collect(),
            skipped,
        })
    }

    /// 修改成绩；已发布的成绩转为 revised
    pub async fn update_grade_impl(&self, grade_id: i64, req: UpdateGradeRequest) -> Result<Grade> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let existing = Self::load_grade(&txn, grade_id).await?;
        let assignment = Self::load_assignment(&txn, existing.assignment_id).await?;
        let marks = req.marks_obtained.or(existing.marks_obtained);
        let total = req.total_marks.unwrap_or(existing.total_marks);
        let comments = req.lecturer_comments.map(|c| clean_comments(Some(c)));

        let mut notifications = Vec::new();
        let updated = Self::edit_grade(
            &txn,
            existing,
            &assignment.title,
            marks,
            total,
            comments,
            None,
            now,
            &mut notifications,
        )
        .await?;

        self.commit_grades(txn, vec![(ChangeKind::Update, &updated)], notifications, now)
            .await?;
        Ok(updated.into_grade())
    }

    /// 发布草稿成绩并通知学生
    pub async fn publish_grade_impl(&self, grade_id: i64, published_by: i64) -> Result<Grade> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let existing = Self::load_grade(&txn, grade_id).await?;
        let status = parse_status(&existing)?.publish()?;
        let assignment = Self::load_assignment(&txn, existing.assignment_id).await?;

        let mut model: ActiveModel = existing.into();
        model.status = Set(status.to_string());
        model.graded_by = Set(Some(published_by));
        model.graded_at = Set(Some(now));
        model.updated_at = Set(now);
        let updated = model
            .update(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("发布成绩失败: {e}")))?;

        let notifications = vec![NewNotification::grade_published(
            updated.student_id,
            updated.id,
            &assignment.title,
        )];
        self.commit_grades(txn, vec![(ChangeKind::Update, &updated)], notifications, now)
            .await?;
        Ok(updated.into_grade())
    }

    pub async fn get_grade_by_id_impl(&self, grade_id: i64) -> Result<Option<Grade>> {
        let result = Grades::find_by_id(grade_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩失败: {e}")))?;

        Ok(result.map(|m| m.into_grade()))
    }

    /// 分页列出成绩（新的在前），附学生姓名与作业标题
    pub async fn list_grades_with_pagination_impl(
        &self,
        query: GradeListQuery,
    ) -> Result<GradeListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = Grades::find();

        if let Some(course_id) = query.course_id {
            select = select.filter(Column::CourseId.eq(course_id));
        }
        if let Some(assignment_id) = query.assignment_id {
            select = select.filter(Column::AssignmentId.eq(assignment_id));
        }
        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }
        if query.hide_drafts {
            select = select.filter(Column::Status.ne(GradeStatus::Draft.to_string()));
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
            let matching = Assignments::find()
                .select_only()
                .column(AssignmentColumn::Id)
                .filter(AssignmentColumn::Title.contains(&escaped))
                .into_query();
            select = select.filter(Column::AssignmentId.in_subquery(matching));
        }

        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩页数失败: {e}")))?;
        let grades = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩列表失败: {e}")))?;

        let mut names: HashMap<i64, Option<String>> = HashMap::new();
        let mut titles: HashMap<i64, Option<String>> = HashMap::new();
        let mut items = Vec::with_capacity(grades.len());
        for grade in grades {
            if !names.contains_key(&grade.student_id) {
                let name = Profiles::find_by_id(grade.student_id)
                    .one(&self.db)
                    .await
                    .map_err(|e| CourseHubError::database_operation(format!("查询学生失败: {e}")))?
                    .map(|p| p.full_name);
                names.insert(grade.student_id, name);
            }
            if !titles.contains_key(&grade.assignment_id) {
                let title = Assignments::find_by_id(grade.assignment_id)
                    .one(&self.db)
                    .await
                    .map_err(|e| CourseHubError::database_operation(format!("查询作业失败: {e}")))?
                    .map(|a| a.title);
                titles.insert(grade.assignment_id, title);
            }

            items.push(GradeListItem {
                student_name: names.get(&grade.student_id).cloned().flatten(),
                assignment_title: titles.get(&grade.assignment_id).cloned().flatten(),
                grade: grade.into_grade(),
            });
        }

        Ok(GradeListResponse {
            items,
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 课程全部成绩（导出用）
    pub async fn list_course_grades_impl(&self, course_id: i64) -> Result<Vec<Grade>> {
        let grades = Grades::find()
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::StudentId)
            .order_by_asc(Column::AssignmentId)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程成绩失败: {e}")))?;

        Ok(grades.into_iter().map(|m| m.into_grade()).collect())
    }

    /// 成绩统计；lecturer_id 为空时统计全部课程
    pub async fn grade_stats_impl(&self, lecturer_id: Option<i64>) -> Result<DashboardStats> {
        let mut courses = Courses::find();
        if let Some(lecturer_id) = lecturer_id {
            courses = courses.filter(CourseColumn::LecturerId.eq(lecturer_id));
        }
        let course_ids: Vec<i64> = courses
            .select_only()
            .column(CourseColumn::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?;

        let students: Vec<i64> = Enrollments::find()
            .select_only()
            .column(EnrollmentColumn::StudentId)
            .filter(EnrollmentColumn::CourseId.is_in(course_ids.clone()))
            .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("统计学生失败: {e}")))?;
        let total_students = students.into_iter().collect::<HashSet<_>>().len();

        let grades = Grades::find()
            .filter(Column::CourseId.is_in(course_ids.clone()))
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("统计成绩失败: {e}")))?;

        let percentages: Vec<f64> = grades.iter().filter_map(|g| g.percentage).collect();
        let pending_grades = grades
            .iter()
            .filter(|g| g.status == GradeStatus::Draft.to_string())
            .count();

        Ok(DashboardStats {
            total_courses: course_ids.len() as i64,
            total_students: total_students as i64,
            total_grades: grades.len() as i64,
            average_grade: mean(&percentages).unwrap_or(0.0),
            pending_grades: pending_grades as i64,
            published_grades: (grades.len() - pending_grades) as i64,
        })
    }

    /// 学生已发布成绩的平均百分比
    pub async fn student_average_percentage_impl(&self, student_id: i64) -> Result<Option<f64>> {
        let percentages: Vec<Option<f64>> = Grades::find()
            .select_only()
            .column(Column::Percentage)
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::Status.ne(GradeStatus::Draft.to_string()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("统计平均成绩失败: {e}")))?;

        let values: Vec<f64> = percentages.into_iter().flatten().collect();
        Ok(mean(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SeaOrmStorage, test_support};
    use crate::models::{
        assignments::entities::Assignment,
        grades::{
            entities::GradeStatus,
            requests::{
                BulkGradeEntry, BulkGradeRequest, CreateGradeRequest, GradeListQuery,
                UpdateGradeRequest,
            },
        },
        notifications::{entities::NotificationType, requests::NotificationListQuery},
        profiles::entities::UserRole,
        users::entities::AuthUser,
    };

    struct Fixture {
        storage: SeaOrmStorage,
        lecturer: AuthUser,
        student: AuthUser,
        assignment: Assignment,
    }

    async fn fixture() -> Fixture {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;
        storage
            .enroll_students_impl(course.id, &[student.id()], lecturer.id())
            .await
            .unwrap();
        let assignment =
            test_support::assignment(&storage, course.id, lecturer.id(), "Midterm", 50.0).await;
        Fixture {
            storage,
            lecturer,
            student,
            assignment,
        }
    }

    fn grade_request(f: &Fixture, marks: f64, status: GradeStatus) -> CreateGradeRequest {
        CreateGradeRequest {
            student_id: f.student.id(),
            assignment_id: f.assignment.id,
            marks_obtained: Some(marks),
            total_marks: None,
            lecturer_comments: Some("  good  ".into()),
            status,
        }
    }

    async fn notifications_of(f: &Fixture, kind: NotificationType) -> i64 {
        f.storage
            .list_notifications_with_pagination_impl(
                f.student.id(),
                NotificationListQuery {
                    notification_type: Some(kind),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .pagination
            .total
    }

    #[tokio::test]
    async fn test_draft_then_publish_then_revise() {
        let f = fixture().await;
        let draft = f
            .storage
            .create_grade_impl(grade_request(&f, 45.0, GradeStatus::Draft), f.lecturer.id())
            .await
            .unwrap();
        assert_eq!(draft.status, GradeStatus::Draft);
        assert_eq!(draft.total_marks, 50.0);
        assert_eq!(draft.percentage, Some(90.0));
        assert_eq!(draft.grade_letter.as_deref(), Some("A"));
        assert_eq!(draft.lecturer_comments.as_deref(), Some("good"));
        assert!(draft.graded_at.is_none());
        assert_eq!(notifications_of(&f, NotificationType::GradePublished).await, 0);

        let published = f
            .storage
            .publish_grade_impl(draft.id, f.lecturer.id())
            .await
            .unwrap();
        assert_eq!(published.status, GradeStatus::Published);
        assert!(published.graded_at.is_some());
        assert_eq!(notifications_of(&f, NotificationType::GradePublished).await, 1);

        let again = f
            .storage
            .publish_grade_impl(draft.id, f.lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(again.code(), "E014");

        let revised = f
            .storage
            .update_grade_impl(
                draft.id,
                UpdateGradeRequest {
                    marks_obtained: Some(30.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(revised.status, GradeStatus::Revised);
        assert_eq!(revised.percentage, Some(60.0));
        assert_eq!(revised.grade_letter.as_deref(), Some("D"));
        assert_eq!(revised.lecturer_comments.as_deref(), Some("good"));
        assert_eq!(notifications_of(&f, NotificationType::GradeUpdated).await, 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_grades() {
        let f = fixture().await;
        let over = f
            .storage
            .create_grade_impl(grade_request(&f, 51.0, GradeStatus::Draft), f.lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(over.code(), "E007");

        let revised = f
            .storage
            .create_grade_impl(grade_request(&f, 10.0, GradeStatus::Revised), f.lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(revised.code(), "E014");

        f.storage
            .create_grade_impl(grade_request(&f, 10.0, GradeStatus::Draft), f.lecturer.id())
            .await
            .unwrap();
        let dup = f
            .storage
            .create_grade_impl(grade_request(&f, 20.0, GradeStatus::Draft), f.lecturer.id())
            .await
            .unwrap_err();
        assert_eq!(dup.code(), "E010");

        let outsider = test_support::user(&f.storage, "Ola", UserRole::Student).await;
        let not_enrolled = f
            .storage
            .create_grade_impl(
                CreateGradeRequest {
                    student_id: outsider.id(),
                    ..grade_request(&f, 10.0, GradeStatus::Draft)
                },
                f.lecturer.id(),
            )
            .await
            .unwrap_err();
        assert_eq!(not_enrolled.code(), "E007");
    }

    #[tokio::test]
    async fn test_bulk_entry_skips_missing_marks() {
        let f = fixture().await;
        let absent = test_support::user(&f.storage, "Amy", UserRole::Student).await;
        f.storage
            .enroll_students_impl(f.assignment.course_id, &[absent.id()], f.lecturer.id())
            .await
            .unwrap();

        let result = f
            .storage
            .bulk_save_grades_impl(
                BulkGradeRequest {
                    assignment_id: f.assignment.id,
                    status: GradeStatus::Published,
                    entries: vec![
                        BulkGradeEntry {
                            student_id: f.student.id(),
                            marks_obtained: Some(40.0),
                            lecturer_comments: None,
                        },
                        BulkGradeEntry {
                            student_id: absent.id(),
                            marks_obtained: None,
                            lecturer_comments: None,
                        },
                    ],
                },
                f.lecturer.id(),
            )
            .await
            .unwrap();
        assert_eq!(result.saved.len(), 1);
        assert_eq!(result.saved[0].status, GradeStatus::Published);
        assert_eq!(result.saved[0].percentage, Some(80.0));
        assert_eq!(result.skipped, vec![absent.id()]);
        assert_eq!(notifications_of(&f, NotificationType::GradePublished).await, 1);
    }

    #[tokio::test]
    async fn test_bulk_entry_is_atomic() {
        let f = fixture().await;
        let err = f
            .storage
            .bulk_save_grades_impl(
                BulkGradeRequest {
                    assignment_id: f.assignment.id,
                    status: GradeStatus::Draft,
                    entries: vec![
                        BulkGradeEntry {
                            student_id: f.student.id(),
                            marks_obtained: Some(40.0),
                            lecturer_comments: None,
                        },
                        BulkGradeEntry {
                            student_id: f.student.id() + 100,
                            marks_obtained: Some(10.0),
                            lecturer_comments: None,
                        },
                    ],
                },
                f.lecturer.id(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E007");

        let listed = f
            .storage
            .list_grades_with_pagination_impl(GradeListQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_students_never_see_drafts() {
        let f = fixture().await;
        let draft = f
            .storage
            .create_grade_impl(grade_request(&f, 45.0, GradeStatus::Draft), f.lecturer.id())
            .await
            .unwrap();

        let student_view = GradeListQuery {
            student_id: Some(f.student.id()),
            hide_drafts: true,
            ..Default::default()
        };
        let hidden = f
            .storage
            .list_grades_with_pagination_impl(student_view.clone())
            .await
            .unwrap();
        assert!(hidden.items.is_empty());
        assert_eq!(
            f.storage
                .student_average_percentage_impl(f.student.id())
                .await
                .unwrap(),
            None
        );

        f.storage
            .publish_grade_impl(draft.id, f.lecturer.id())
            .await
            .unwrap();
        let visible = f
            .storage
            .list_grades_with_pagination_impl(GradeListQuery {
                search: Some("mid".into()),
                ..student_view
            })
            .await
            .unwrap();
        assert_eq!(visible.items.len(), 1);
        assert_eq!(visible.items[0].student_name.as_deref(), Some("Sam"));
        assert_eq!(visible.items[0].assignment_title.as_deref(), Some("Midterm"));
        assert_eq!(
            f.storage
                .student_average_percentage_impl(f.student.id())
                .await
                .unwrap(),
            Some(90.0)
        );
    }

    #[tokio::test]
    async fn test_unenroll_keeps_grades_and_stats() {
        let f = fixture().await;
        f.storage
            .create_grade_impl(
                grade_request(&f, 40.0, GradeStatus::Published),
                f.lecturer.id(),
            )
            .await
            .unwrap();

        let stats = f
            .storage
            .grade_stats_impl(Some(f.lecturer.id()))
            .await
            .unwrap();
        assert_eq!(stats.total_courses, 1);
        assert_eq!(stats.total_students, 1);
        assert_eq!(stats.total_grades, 1);
        assert_eq!(stats.published_grades, 1);
        assert_eq!(stats.average_grade, 80.0);

        f.storage
            .unenroll_student_impl(f.assignment.course_id, f.student.id())
            .await
            .unwrap();
        let grades = f
            .storage
            .list_course_grades_impl(f.assignment.course_id)
            .await
            .unwrap();
        assert_eq!(grades.len(), 1);
    }
}
