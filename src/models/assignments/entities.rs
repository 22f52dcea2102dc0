use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 考核类型，导出成绩表时按类型分列
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub enum AssignmentType {
    Assignment,
    Test,
    Attendance,
    Practical,
    Examination,
    Classwork,
}

impl AssignmentType {
    pub fn all() -> &'static [AssignmentType] {
        &[
            AssignmentType::Assignment,
            AssignmentType::Test,
            AssignmentType::Attendance,
            AssignmentType::Practical,
            AssignmentType::Examination,
            AssignmentType::Classwork,
        ]
    }

    /// 表头用名称
    pub fn label(&self) -> &'static str {
        match self {
            AssignmentType::Assignment => "Assignment",
            AssignmentType::Test => "Test",
            AssignmentType::Attendance => "Attendance",
            AssignmentType::Practical => "Practical",
            AssignmentType::Examination => "Examination",
            AssignmentType::Classwork => "Classwork",
        }
    }
}

impl std::fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssignmentType::Assignment => "assignment",
            AssignmentType::Test => "test",
            AssignmentType::Attendance => "attendance",
            AssignmentType::Practical => "practical",
            AssignmentType::Examination => "examination",
            AssignmentType::Classwork => "classwork",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AssignmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssignmentType::all()
            .iter()
            .copied()
            .find(|t| t.to_string() == s)
            .ok_or_else(|| format!("Invalid assignment type: {s}"))
    }
}

// 作业 / 考核项
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub instructor_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub assignment_type: AssignmentType,
    pub max_points: f64,
    pub due_date: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parse_matches_display() {
        for t in AssignmentType::all() {
            assert_eq!(t.to_string().parse::<AssignmentType>().unwrap(), *t);
        }
        assert!("quiz".parse::<AssignmentType>().is_err());
    }
}
