use super::entities::UserRole;
use serde::Deserialize;
use ts_rs::TS;

// 建档请求（注册后首次填写）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/profile.ts")]
pub struct CreateProfileRequest {
    pub full_name: String,
    pub role: UserRole,
    pub student_id: Option<String>,
    pub lecturer_id: Option<String>,
    pub department: Option<String>,
    pub year_of_study: Option<i32>,
    pub avatar_url: Option<String>,
}

// 资料更新请求（不含角色）
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/profile.ts")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub lecturer_id: Option<String>,
    pub department: Option<String>,
    pub year_of_study: Option<i32>,
    pub avatar_url: Option<String>,
}

impl CreateProfileRequest {
    /// 自助建档校验：姓名必填，不能自选管理员
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.full_name.trim().is_empty() {
            return Err("Full name is required");
        }
        if !self.role.is_self_assignable() {
            return Err("This role cannot be self-assigned");
        }
        if self.year_of_study.is_some_and(|y| !(1..=10).contains(&y)) {
            return Err("Year of study must be between 1 and 10");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(full_name: &str, role: UserRole) -> CreateProfileRequest {
        CreateProfileRequest {
            full_name: full_name.to_string(),
            role,
            student_id: None,
            lecturer_id: None,
            department: Some("Computing".to_string()),
            year_of_study: None,
            avatar_url: None,
        }
    }

    #[test]
    fn test_profile_validation() {
        assert!(request("Ada Obi", UserRole::Student).validate().is_ok());
        assert!(request("  ", UserRole::Lecturer).validate().is_err());
        assert_eq!(
            request("Root", UserRole::Admin).validate().unwrap_err(),
            "This role cannot be self-assigned"
        );

        let mut req = request("Ada Obi", UserRole::Student);
        req.year_of_study = Some(0);
        assert!(req.validate().is_err());
    }
}
