use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::CourseService;
use crate::middlewares::RequireJWT;
use crate::models::courses::entities::CourseScope;
use crate::models::courses::requests::{CourseListQuery, CourseQueryParams};
use crate::models::profiles::entities::UserRole;
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, storage_error_response, unauthorized_response};

pub async fn list_courses(
    service: &CourseService,
    request: &HttpRequest,
    query: CourseQueryParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };

    let list_query = match scoped_query(&auth_user, query) {
        Ok(q) => q,
        Err(resp) => return Ok(resp),
    };

    let storage = service.get_storage(request);
    match storage.list_courses_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Course list retrieved successfully",
        ))),
        Err(e) => Ok(storage_error_response(
            "Failed to retrieve course list",
            e,
            ErrorCode::CourseNotFound,
        )),
    }
}

/// 按角色与范围收窄查询
fn scoped_query(
    auth_user: &AuthUser,
    query: CourseQueryParams,
) -> Result<CourseListQuery, HttpResponse> {
    let mut list_query = CourseListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        search: query.search,
        department: query.department,
        ..Default::default()
    };

    match (auth_user.role(), query.scope) {
        (Some(UserRole::Admin), _) | (Some(UserRole::Lecturer), CourseScope::Available) => {}
        (Some(UserRole::Lecturer), CourseScope::Mine) => {
            list_query.lecturer_id = Some(auth_user.id());
        }
        (Some(UserRole::Student), CourseScope::Mine) => {
            list_query.enrolled_student_id = Some(auth_user.id());
        }
        (Some(UserRole::Student), CourseScope::Available) => {
            // 只看本院系尚未选修的课程
            list_query.exclude_student_id = Some(auth_user.id());
            list_query.department = auth_user
                .profile
                .as_ref()
                .and_then(|p| p.department.clone());
        }
        (None, _) => return Err(forbidden_response("Profile required")),
    }

    Ok(list_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationQuery;
    use crate::models::profiles::entities::Profile;
    use crate::models::users::entities::{User, UserStatus};

    fn auth_user(role: UserRole, department: &str) -> AuthUser {
        let now = chrono::Utc::now();
        AuthUser {
            user: User {
                id: 4,
                email: "u@uni.edu".to_string(),
                password_hash: String::new(),
                status: UserStatus::Active,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            profile: Some(Profile {
                id: 4,
                email: "u@uni.edu".to_string(),
                full_name: "U".to_string(),
                role,
                student_id: None,
                lecturer_id: None,
                department: Some(department.to_string()),
                year_of_study: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            }),
        }
    }

    fn params(scope: CourseScope) -> CourseQueryParams {
        CourseQueryParams {
            pagination: PaginationQuery::default(),
            search: None,
            department: Some("Physics".to_string()),
            scope,
        }
    }

    #[test]
    fn test_student_available_scope_uses_own_department() {
        let q = scoped_query(&auth_user(UserRole::Student, "Maths"), params(CourseScope::Available))
            .unwrap();
        assert_eq!(q.exclude_student_id, Some(4));
        assert_eq!(q.department.as_deref(), Some("Maths"));
        assert_eq!(q.enrolled_student_id, None);
    }

    #[test]
    fn test_lecturer_mine_scope() {
        let q = scoped_query(&auth_user(UserRole::Lecturer, "Maths"), params(CourseScope::Mine))
            .unwrap();
        assert_eq!(q.lecturer_id, Some(4));
    }

    #[test]
    fn test_missing_profile_is_rejected() {
        let mut user = auth_user(UserRole::Student, "Maths");
        user.profile = None;
        assert!(scoped_query(&user, params(CourseScope::Mine)).is_err());
    }
}
