//! 课程成绩表导出（CSV）
//!
//! 每名有效选课学生一行：学号、姓名、各考核类型的得分合计、平均百分比。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;
use std::sync::Arc;

use super::GradeService;
use crate::errors::{CourseHubError, Result};
use crate::middlewares::RequireCourseLecturer;
use crate::models::assignments::entities::AssignmentType;
use crate::models::assignments::requests::AssignmentListQuery;
use crate::models::courses::responses::EnrolledStudent;
use crate::models::grades::entities::Grade;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::storage_error_response;
use crate::storage::Storage;

const SHEET_COLUMNS: [AssignmentType; 6] = [
    AssignmentType::Assignment,
    AssignmentType::Test,
    AssignmentType::Examination,
    AssignmentType::Attendance,
    AssignmentType::Classwork,
    AssignmentType::Practical,
];

pub async fn export_course_grades(
    service: &GradeService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    // RequireCourseLecturer 已加载课程
    let Some(course) = RequireCourseLecturer::extract_course(request) else {
        return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::CourseNotFound,
            "Course not found",
        )));
    };
    let storage = service.get_storage(request);

    let sheet = match load_sheet_data(&storage, course_id).await {
        Ok((students, grades, types)) => build_grade_sheet(&students, &grades, &types),
        Err(e) => Err(e),
    };

    match sheet {
        Ok(buffer) => {
            let filename = format!(
                "{}_grades_{}.csv",
                course.course_code,
                chrono::Utc::now().format("%Y-%m-%d")
            );
            tracing::info!("Exported grade sheet {}", filename);
            Ok(HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{filename}\""),
                ))
                .body(buffer))
        }
        Err(e) => Ok(storage_error_response(
            "Export grades failed",
            e,
            ErrorCode::GradeExportFailed,
        )),
    }
}

type SheetData = (Vec<EnrolledStudent>, Vec<Grade>, HashMap<i64, AssignmentType>);

async fn load_sheet_data(storage: &Arc<dyn Storage>, course_id: i64) -> Result<SheetData> {
    let students = storage.list_enrolled_students(course_id).await?;
    let grades = storage.list_course_grades(course_id).await?;

    // 作业 ID → 类型
    let mut types = HashMap::new();
    let mut page = 1;
    loop {
        let response = storage
            .list_assignments_with_pagination(AssignmentListQuery {
                page: Some(page),
                size: Some(100),
                course_id: Some(course_id),
                ..Default::default()
            })
            .await?;
        types.extend(
            response
                .items
                .iter()
                .map(|a| (a.id, a.assignment_type)),
        );
        if !response.pagination.has_next() {
            break;
        }
        page += 1;
    }

    Ok((students, grades, types))
}

/// 生成 CSV 内容
pub(crate) fn build_grade_sheet(
    students: &[EnrolledStudent],
    grades: &[Grade],
    types: &HashMap<i64, AssignmentType>,
) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Student ID".to_string(), "Full Name".to_string()];
    header.extend(SHEET_COLUMNS.iter().map(|t| t.label().to_string()));
    header.push("Average %".to_string());
    writer.write_record(&header)?;

    for entry in students {
        let student = &entry.student;
        let own: Vec<&Grade> = grades
            .iter()
            .filter(|g| g.student_id == student.id)
            .collect();

        let mut record = vec![
            text_cell(student.student_id.as_deref().unwrap_or_default()),
            text_cell(&student.full_name),
        ];
        for column in SHEET_COLUMNS {
            let total: f64 = own
                .iter()
                .filter(|g| types.get(&g.assignment_id) == Some(&column))
                .filter_map(|g| g.marks_obtained)
                .fold(0.0, |acc, marks| acc + marks);
            record.push(format_number(total));
        }

        let percentages: Vec<f64> = own.iter().filter_map(|g| g.percentage).collect();
        record.push(if percentages.is_empty() {
            String::new()
        } else {
            format!(
                "{:.2}",
                percentages.iter().sum::<f64>() / percentages.len() as f64
            )
        });

        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| CourseHubError::export(format!("写入 CSV 失败: {e}")))
}

/// 用户填写的文本以公式字符开头时加 `'`，表格软件不会把它当公式执行
fn text_cell(value: &str) -> String {
    match value.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{value}"),
        _ => value.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollments::entities::{Enrollment, EnrollmentStatus};
    use crate::models::grades::entities::{DerivedScore, GradeStatus};
    use crate::models::profiles::entities::{Profile, UserRole};

    fn student(id: i64, number: &str, name: &str) -> EnrolledStudent {
        let now = chrono::Utc::now();
        EnrolledStudent {
            enrollment: Enrollment {
                id,
                student_id: id,
                course_id: 1,
                status: EnrollmentStatus::Active,
                enrollment_date: now,
            },
            student: Profile {
                id,
                email: format!("{id}@uni.edu"),
                full_name: name.to_string(),
                role: UserRole::Student,
                student_id: Some(number.to_string()),
                lecturer_id: None,
                department: None,
                year_of_study: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn grade(student_id: i64, assignment_id: i64, marks: f64, total: f64) -> Grade {
        let now = chrono::Utc::now();
        let derived = DerivedScore::compute(Some(marks), total);
        Grade {
            id: student_id * 10 + assignment_id,
            student_id,
            course_id: 1,
            assignment_id,
            marks_obtained: Some(marks),
            total_marks: total,
            percentage: derived.percentage,
            grade_letter: derived.grade_letter,
            status: GradeStatus::Published,
            lecturer_comments: None,
            graded_by: Some(9),
            graded_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sheet_sums_marks_per_type() {
        let types = HashMap::from([
            (1, AssignmentType::Assignment),
            (2, AssignmentType::Assignment),
            (3, AssignmentType::Examination),
        ]);
        let students = vec![student(1, "S001", "Ada Obi"), student(2, "S002", "Ben Lee")];
        let grades = vec![
            grade(1, 1, 8.0, 10.0),
            grade(1, 2, 6.5, 10.0),
            grade(1, 3, 45.0, 60.0),
        ];

        let csv = String::from_utf8(build_grade_sheet(&students, &grades, &types).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Student ID,Full Name,Assignment,Test,Examination,Attendance,Classwork,Practical,Average %"
        );
        // (80 + 65 + 75) / 3
        assert_eq!(lines[1], "S001,Ada Obi,14.50,0,45,0,0,0,73.33");
        assert_eq!(lines[2], "S002,Ben Lee,0,0,0,0,0,0,");
    }

    #[test]
    fn test_sheet_neutralises_formula_cells() {
        let students = vec![
            student(1, "=1+2", "@SUM(A1:A9)"),
            student(2, "S002", "-Ben"),
            student(3, "S003", "Cy Ng"),
        ];

        let csv = String::from_utf8(build_grade_sheet(&students, &[], &HashMap::new()).unwrap())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "'=1+2,'@SUM(A1:A9),0,0,0,0,0,0,");
        assert_eq!(lines[2], "S002,'-Ben,0,0,0,0,0,0,");
        assert_eq!(lines[3], "S003,Cy Ng,0,0,0,0,0,0,");
    }
}
