use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{GradeService, grade_error_response};
use crate::middlewares::RequireJWT;
use crate::models::grades::requests::{GradeListParams, GradeListQuery};
use crate::models::profiles::entities::UserRole;
use crate::models::users::entities::AuthUser;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{forbidden_response, load_managed_course, unauthorized_response};

/// 学生只看本人非草稿成绩，讲师只看所授课程
fn scoped_query(auth_user: &AuthUser, params: GradeListParams) -> Option<GradeListQuery> {
    let mut query = GradeListQuery {
        page: Some(params.pagination.page),
        size: Some(params.pagination.size),
        course_id: params.course_id,
        assignment_id: params.assignment_id,
        student_id: params.student_id,
        status: params.status,
        search: params.search,
        ..Default::default()
    };
    match auth_user.role()? {
        UserRole::Student => {
            query.student_id = Some(auth_user.id());
            query.hide_drafts = true;
        }
        UserRole::Lecturer => query.lecturer_id = Some(auth_user.id()),
        UserRole::Admin => {}
    }
    Some(query)
}

pub async fn list_grades(
    service: &GradeService,
    request: &HttpRequest,
    params: GradeListParams,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let Some(query) = scoped_query(&auth_user, params) else {
        return Ok(forbidden_response("Profile required"));
    };

    let storage = service.get_storage(request);
    match storage.list_grades_with_pagination(query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Grades retrieved successfully",
        ))),
        Err(e) => Ok(grade_error_response("List grades failed", e)),
    }
}

pub async fn get_grade(
    service: &GradeService,
    request: &HttpRequest,
    id: i64,
) -> ActixResult<HttpResponse> {
    let Some(auth_user) = RequireJWT::extract_auth_user(request) else {
        return Ok(unauthorized_response());
    };
    let storage = service.get_storage(request);

    let not_found = || {
        HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::GradeNotFound,
            "Grade not found",
        ))
    };

    let grade = match storage.get_grade_by_id(id).await {
        Ok(Some(g)) => g,
        Ok(None) => return Ok(not_found()),
        Err(e) => return Ok(grade_error_response("Get grade failed", e)),
    };

    match auth_user.role() {
        // 草稿对学生按不存在处理
        Some(UserRole::Student) => {
            if grade.student_id != auth_user.id() || !grade.status.is_visible_to_student() {
                return Ok(not_found());
            }
        }
        Some(_) => {
            if let Err(resp) = load_managed_course(&storage, &auth_user, grade.course_id).await {
                return Ok(resp);
            }
        }
        None => return Ok(forbidden_response("Profile required")),
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(grade, "Grade retrieved successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationQuery;
    use crate::models::grades::entities::GradeStatus;
    use crate::models::profiles::entities::Profile;
    use crate::models::users::entities::{User, UserStatus};

    fn auth_user(id: i64, role: Option<UserRole>) -> AuthUser {
        let now = chrono::Utc::now();
        AuthUser {
            user: User {
                id,
                email: format!("{id}@uni.edu"),
                password_hash: String::new(),
                status: UserStatus::Active,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            profile: role.map(|role| Profile {
                id,
                email: format!("{id}@uni.edu"),
                full_name: "Someone".to_string(),
                role,
                student_id: None,
                lecturer_id: None,
                department: None,
                year_of_study: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            }),
        }
    }

    fn params() -> GradeListParams {
        GradeListParams {
            pagination: PaginationQuery::default(),
            course_id: Some(2),
            assignment_id: None,
            student_id: Some(99),
            status: Some(GradeStatus::Draft),
            search: None,
        }
    }

    #[test]
    fn test_student_query_is_pinned_to_self_and_hides_drafts() {
        let query = scoped_query(&auth_user(5, Some(UserRole::Student)), params()).unwrap();
        assert_eq!(query.student_id, Some(5));
        assert!(query.hide_drafts);
        assert_eq!(query.lecturer_id, None);
    }

    #[test]
    fn test_lecturer_query_is_limited_to_taught_courses() {
        let query = scoped_query(&auth_user(8, Some(UserRole::Lecturer)), params()).unwrap();
        assert_eq!(query.lecturer_id, Some(8));
        assert_eq!(query.student_id, Some(99));
        assert!(!query.hide_drafts);
    }

    #[test]
    fn test_account_without_profile_gets_nothing() {
        assert!(scoped_query(&auth_user(3, None), params()).is_none());
    }
}
