//! 成绩实体与生命周期规则
//!
//! 状态流转：`draft → published → revised`，任何状态都不能回到 draft。
//! 百分比与等级由后端在每次写入时计算。

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{CourseHubError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub enum GradeStatus {
    Draft,     // 草稿，学生不可见
    Published, // 已发布
    Revised,   // 发布后又被修改
}

impl GradeStatus {
    /// 发布：仅草稿可发布
    pub fn publish(self) -> Result<Self> {
        match self {
            GradeStatus::Draft => Ok(GradeStatus::Published),
            other => Err(CourseHubError::invalid_transition(format!(
                "Grade is already {other}"
            ))),
        }
    }

    /// 修改分数或评语后的状态
    pub fn after_edit(self) -> Self {
        match self {
            GradeStatus::Draft => GradeStatus::Draft,
            GradeStatus::Published | GradeStatus::Revised => GradeStatus::Revised,
        }
    }

    /// 新建成绩只能是草稿或直接发布
    pub fn ensure_initial(self) -> Result<Self> {
        match self {
            GradeStatus::Draft | GradeStatus::Published => Ok(self),
            GradeStatus::Revised => Err(CourseHubError::invalid_transition(
                "A new grade can only be saved as draft or published",
            )),
        }
    }

    pub fn is_visible_to_student(&self) -> bool {
        !matches!(self, GradeStatus::Draft)
    }
}

impl std::fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeStatus::Draft => write!(f, "draft"),
            GradeStatus::Published => write!(f, "published"),
            GradeStatus::Revised => write!(f, "revised"),
        }
    }
}

impl std::str::FromStr for GradeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(GradeStatus::Draft),
            "published" => Ok(GradeStatus::Published),
            "revised" => Ok(GradeStatus::Revised),
            _ => Err(format!("Invalid grade status: {s}")),
        }
    }
}

/// 百分比，保留两位小数
pub fn compute_percentage(marks_obtained: f64, total_marks: f64) -> f64 {
    (marks_obtained / total_marks * 10000.0).round() / 100.0
}

/// 等级：A ≥ 90, B ≥ 80, C ≥ 70, D ≥ 60, 其余 F
pub fn grade_letter(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 90.0 => "A",
        p if p >= 80.0 => "B",
        p if p >= 70.0 => "C",
        p if p >= 60.0 => "D",
        _ => "F",
    }
}

/// 校验 `0 ≤ marks ≤ total` 且 `total > 0`
pub fn validate_marks(marks_obtained: Option<f64>, total_marks: f64) -> Result<()> {
    if !total_marks.is_finite() || total_marks <= 0.0 {
        return Err(CourseHubError::validation(
            "Total marks must be greater than zero",
        ));
    }
    if let Some(marks) = marks_obtained {
        if !marks.is_finite() || marks < 0.0 {
            return Err(CourseHubError::validation(
                "Marks obtained cannot be negative",
            ));
        }
        if marks > total_marks {
            return Err(CourseHubError::validation(format!(
                "Marks obtained ({marks}) cannot exceed total marks ({total_marks})"
            )));
        }
    }
    Ok(())
}

/// 派生值；没有分数时两者皆为空
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedScore {
    pub percentage: Option<f64>,
    pub grade_letter: Option<String>,
}

impl DerivedScore {
    pub fn compute(marks_obtained: Option<f64>, total_marks: f64) -> Self {
        let percentage = marks_obtained.map(|m| compute_percentage(m, total_marks));
        Self {
            percentage,
            grade_letter: percentage.map(|p| grade_letter(p).to_string()),
        }
    }
}

// 成绩
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub assignment_id: i64,
    pub marks_obtained: Option<f64>,
    pub total_marks: f64,
    pub percentage: Option<f64>,
    pub grade_letter: Option<String>,
    pub status: GradeStatus,
    pub lecturer_comments: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(compute_percentage(45.0, 50.0), 90.0);
        assert_eq!(compute_percentage(2.0, 3.0), 66.67);
        assert_eq!(compute_percentage(0.0, 20.0), 0.0);
    }

    #[test]
    fn test_grade_letter_bands() {
        assert_eq!(grade_letter(100.0), "A");
        assert_eq!(grade_letter(90.0), "A");
        assert_eq!(grade_letter(89.99), "B");
        assert_eq!(grade_letter(80.0), "B");
        assert_eq!(grade_letter(70.0), "C");
        assert_eq!(grade_letter(60.0), "D");
        assert_eq!(grade_letter(59.99), "F");
    }

    #[test]
    fn test_derived_score_absent_without_marks() {
        let derived = DerivedScore::compute(None, 100.0);
        assert_eq!(derived.percentage, None);
        assert_eq!(derived.grade_letter, None);

        let derived = DerivedScore::compute(Some(72.5), 100.0);
        assert_eq!(derived.percentage, Some(72.5));
        assert_eq!(derived.grade_letter.as_deref(), Some("C"));
    }

    #[test]
    fn test_validate_marks() {
        assert!(validate_marks(Some(50.0), 50.0).is_ok());
        assert!(validate_marks(None, 10.0).is_ok());
        assert_eq!(validate_marks(Some(51.0), 50.0).unwrap_err().code(), "E007");
        assert!(validate_marks(Some(-1.0), 50.0).is_err());
        assert!(validate_marks(Some(0.0), 0.0).is_err());
    }

    #[test]
    fn test_publish_only_from_draft() {
        assert_eq!(GradeStatus::Draft.publish().unwrap(), GradeStatus::Published);
        assert!(GradeStatus::Published.publish().is_err());
        assert!(GradeStatus::Revised.publish().is_err());
    }

    #[test]
    fn test_edit_never_returns_to_draft() {
        assert_eq!(GradeStatus::Draft.after_edit(), GradeStatus::Draft);
        assert_eq!(GradeStatus::Published.after_edit(), GradeStatus::Revised);
        assert_eq!(GradeStatus::Revised.after_edit(), GradeStatus::Revised);
    }

    #[test]
    fn test_initial_status() {
        assert!(GradeStatus::Draft.ensure_initial().is_ok());
        assert!(GradeStatus::Published.ensure_initial().is_ok());
        assert!(GradeStatus::Revised.ensure_initial().is_err());
        assert!(!GradeStatus::Draft.is_visible_to_student());
        assert!(GradeStatus::Revised.is_visible_to_student());
    }
}
