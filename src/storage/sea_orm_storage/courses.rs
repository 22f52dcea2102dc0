//! 课程存储操作

use super::{SeaOrmStorage, page_and_size};
use crate::entity::assignments::{Column as AssignmentColumn, Entity as Assignments};
use crate::entity::courses::{ActiveModel, Column, Entity as Courses, Model};
use crate::entity::enrollments::{Column as EnrollmentColumn, Entity as Enrollments};
use crate::entity::profiles::{Column as ProfileColumn, Entity as Profiles};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    courses::{
        entities::Course,
        requests::{CourseListQuery, CreateCourseRequest, UpdateCourseRequest},
        responses::{CourseListItem, CourseListResponse, EnrolledStudent},
    },
    enrollments::entities::EnrollmentStatus,
    profiles::entities::{Profile, UserRole},
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set,
};

fn course_event(kind: ChangeKind, model: &Model) -> ChangeEvent {
    let event = ChangeEvent::new(ChangeTable::Courses, kind, model.id);
    match model.lecturer_id {
        Some(lecturer_id) => event.key("lecturer_id", lecturer_id),
        None => event,
    }
}

// 某学生有效选课的课程 ID 子查询
fn active_course_ids_of(student_id: i64) -> sea_orm::sea_query::SelectStatement {
    Enrollments::find()
        .select_only()
        .column(EnrollmentColumn::CourseId)
        .filter(EnrollmentColumn::StudentId.eq(student_id))
        .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
        .into_query()
}

impl SeaOrmStorage {
    /// 创建课程；课程代码唯一
    pub async fn create_course_impl(
        &self,
        req: CreateCourseRequest,
        lecturer_id: i64,
    ) -> Result<Course> {
        let code = req.course_code.trim().to_string();
        let exists = Courses::find()
            .filter(Column::CourseCode.eq(&code))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?;
        if exists.is_some() {
            return Err(CourseHubError::conflict("Course code already exists"));
        }

        let now = chrono::Utc::now().timestamp();
        let model = ActiveModel {
            course_code: Set(code),
            course_name: Set(req.course_name.trim().to_string()),
            description: Set(req.description),
            lecturer_id: Set(Some(lecturer_id)),
            department: Set(req.department.trim().to_string()),
            credits: Set(req.credits.unwrap_or(3)),
            semester: Set(req.semester),
            academic_year: Set(req.academic_year),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建课程失败: {e}")))?;

        self.changes.publish(course_event(ChangeKind::Insert, &result));
        Ok(result.into_course())
    }

    /// 通过 ID 获取课程
    pub async fn get_course_by_id_impl(&self, course_id: i64) -> Result<Option<Course>> {
        let result = Courses::find_by_id(course_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?;

        Ok(result.map(|m| m.into_course()))
    }

    /// 更新课程信息
    pub async fn update_course_impl(
        &self,
        course_id: i64,
        update: UpdateCourseRequest,
    ) -> Result<Option<Course>> {
        let Some(existing) = Courses::find_by_id(course_id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        if let Some(name) = update.course_name {
            model.course_name = Set(name);
        }
        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }
        if let Some(department) = update.department {
            model.department = Set(department);
        }
        if let Some(credits) = update.credits {
            model.credits = Set(credits);
        }
        if let Some(semester) = update.semester {
            model.semester = Set(Some(semester));
        }
        if let Some(academic_year) = update.academic_year {
            model.academic_year = Set(Some(academic_year));
        }
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新课程失败: {e}")))?;

        self.changes.publish(course_event(ChangeKind::Update, &updated));
        Ok(Some(updated.into_course()))
    }

    /// 分页列出课程，附带选课人数与作业数
    pub async fn list_courses_with_pagination_impl(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        let (page, size) = page_and_size(query.page, query.size);

        let mut select = Courses::find();

        if let Some(lecturer_id) = query.lecturer_id {
            select = select.filter(Column::LecturerId.eq(lecturer_id));
        }
        if let Some(student_id) = query.enrolled_student_id {
            select = select.filter(Column::Id.in_subquery(active_course_ids_of(student_id)));
        }
        if let Some(student_id) = query.exclude_student_id {
            select = select.filter(Column::Id.not_in_subquery(active_course_ids_of(student_id)));
        }
        if let Some(ref department) = query.department
            && !department.trim().is_empty()
        {
            select = select.filter(Column::Department.eq(department.trim()));
        }

        // 搜索条件：课程代码或名称
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(
                Condition::any()
                    .add(Column::CourseCode.contains(&escaped))
                    .add(Column::CourseName.contains(&escaped)),
            );
        }

        select = select.order_by_asc(Column::CourseCode);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程页数失败: {e}")))?;
        let courses = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程列表失败: {e}")))?;

        let mut items = Vec::with_capacity(courses.len());
        for course in courses {
            let enrolled_students = Enrollments::find()
                .filter(EnrollmentColumn::CourseId.eq(course.id))
                .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
                .count(&self.db)
                .await
                .map_err(|e| {
                    CourseHubError::database_operation(format!("统计选课人数失败: {e}"))
                })?;
            let assignment_count = Assignments::find()
                .filter(AssignmentColumn::CourseId.eq(course.id))
                .count(&self.db)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("统计作业数失败: {e}")))?;

            items.push(CourseListItem {
                course: course.into_course(),
                enrolled_students: enrolled_students as i64,
                assignment_count: assignment_count as i64,
            });
        }

        Ok(CourseListResponse {
            items,
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 有效选课的学生名单
    pub async fn list_enrolled_students_impl(&self, course_id: i64) -> Result<Vec<EnrolledStudent>> {
        let rows = Enrollments::find()
            .filter(EnrollmentColumn::CourseId.eq(course_id))
            .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
            .find_also_related(Profiles)
            .order_by_asc(ProfileColumn::FullName)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课名单失败: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|(enrollment, student)| {
                student.map(|s| EnrolledStudent {
                    enrollment: enrollment.into_enrollment(),
                    student: s.into_profile(),
                })
            })
            .collect())
    }

    /// 与课程同院系且尚未有效选课的学生
    pub async fn list_available_students_impl(&self, course_id: i64) -> Result<Vec<Profile>> {
        let Some(course) = self.get_course_by_id_impl(course_id).await? else {
            return Err(CourseHubError::not_found("Course not found"));
        };

        let enrolled = Enrollments::find()
            .select_only()
            .column(EnrollmentColumn::StudentId)
            .filter(EnrollmentColumn::CourseId.eq(course_id))
            .filter(EnrollmentColumn::Status.eq(EnrollmentStatus::Active.to_string()))
            .into_query();

        let rows = Profiles::find()
            .filter(ProfileColumn::Role.eq(UserRole::Student.to_string()))
            .filter(ProfileColumn::Department.eq(course.department))
            .filter(ProfileColumn::Id.not_in_subquery(enrolled))
            .order_by_asc(ProfileColumn::FullName)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询可选学生失败: {e}")))?;

        Ok(rows.into_iter().map(|m| m.into_profile()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::{
        courses::requests::{CourseListQuery, UpdateCourseRequest},
        profiles::entities::UserRole,
    };

    #[tokio::test]
    async fn test_course_code_is_unique() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let course = test_support::course(&storage, "CS101", lecturer.id()).await;
        assert_eq!(course.credits, 3);
        assert!(course.is_taught_by(lecturer.id()));

        let dup = storage
            .create_course_impl(
                crate::models::courses::requests::CreateCourseRequest {
                    course_code: "CS101".into(),
                    course_name: "Other".into(),
                    description: None,
                    department: "Computing".into(),
                    credits: Some(4),
                    semester: None,
                    academic_year: None,
                    lecturer_id: None,
                },
                lecturer.id(),
            )
            .await
            .unwrap_err();
        assert_eq!(dup.code(), "E010");
        assert_eq!(dup.message(), "Course code already exists");
    }

    #[tokio::test]
    async fn test_lists_by_scope() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let student = test_support::user(&storage, "Sam", UserRole::Student).await;
        let a = test_support::course(&storage, "CS101", lecturer.id()).await;
        test_support::course(&storage, "CS102", lecturer.id()).await;
        storage
            .enroll_students_impl(a.id, &[student.id()], lecturer.id())
            .await
            .unwrap();

        let mine = storage
            .list_courses_with_pagination_impl(CourseListQuery {
                enrolled_student_id: Some(student.id()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.items.len(), 1);
        assert_eq!(mine.items[0].course.course_code, "CS101");
        assert_eq!(mine.items[0].enrolled_students, 1);

        let available = storage
            .list_courses_with_pagination_impl(CourseListQuery {
                exclude_student_id: Some(student.id()),
                department: Some("Computing".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.items.len(), 1);
        assert_eq!(available.items[0].course.course_code, "CS102");

        let taught = storage
            .list_courses_with_pagination_impl(CourseListQuery {
                lecturer_id: Some(lecturer.id()),
                search: Some("CS10".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(taught.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_roster_and_available_students() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let enrolled = test_support::user(&storage, "Amy", UserRole::Student).await;
        let waiting = test_support::user(&storage, "Ben", UserRole::Student).await;
        let course = test_support::course(&storage, "CS201", lecturer.id()).await;
        storage
            .enroll_students_impl(course.id, &[enrolled.id()], lecturer.id())
            .await
            .unwrap();

        let roster = storage.list_enrolled_students_impl(course.id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].student.id, enrolled.id());

        let available = storage
            .list_available_students_impl(course.id)
            .await
            .unwrap();
        let ids: Vec<i64> = available.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![waiting.id()]);
    }

    #[tokio::test]
    async fn test_update_course() {
        let storage = test_support::storage().await;
        let lecturer = test_support::user(&storage, "Lee", UserRole::Lecturer).await;
        let course = test_support::course(&storage, "CS301", lecturer.id()).await;

        let updated = storage
            .update_course_impl(
                course.id,
                UpdateCourseRequest {
                    course_name: Some("Compilers".into()),
                    credits: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.course_name, "Compilers");
        assert_eq!(updated.credits, 5);
        assert_eq!(updated.course_code, "CS301");
    }
}
