use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::announcements::requests::{AnnouncementListParams, CreateAnnouncementRequest};
use crate::models::assignments::requests::CreateAssignmentRequest;
use crate::models::courses::requests::{
    CourseQueryParams, CreateCourseRequest, UpdateCourseRequest,
};
use crate::models::enrollments::requests::EnrollStudentsRequest;
use crate::models::profiles::entities::UserRole;
use crate::services::{AnnouncementService, AssignmentService, CourseService, GradeService};
use crate::utils::{SafeCourseIdI64, SafeStudentIdI64};

static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);
static ASSIGNMENT_SERVICE: Lazy<AssignmentService> = Lazy::new(AssignmentService::new_lazy);
static ANNOUNCEMENT_SERVICE: Lazy<AnnouncementService> =
    Lazy::new(AnnouncementService::new_lazy);
static GRADE_SERVICE: Lazy<GradeService> = Lazy::new(GradeService::new_lazy);

pub async fn list_courses(
    req: HttpRequest,
    query: web::Query<CourseQueryParams>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_courses(&req, query.into_inner()).await
}

pub async fn create_course(
    req: HttpRequest,
    course_data: web::Json<CreateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_course(&req, course_data.into_inner())
        .await
}

pub async fn get_course(req: HttpRequest, course_id: SafeCourseIdI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.get_course(&req, course_id.0).await
}

pub async fn update_course(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    update_data: web::Json<UpdateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .update_course(&req, course_id.0, update_data.into_inner())
        .await
}

pub async fn list_students(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_students(&req, course_id.0).await
}

pub async fn list_available_students(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .list_available_students(&req, course_id.0)
        .await
}

pub async fn enroll_students(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    enroll_data: web::Json<EnrollStudentsRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .enroll_students(&req, course_id.0, enroll_data.into_inner())
        .await
}

pub async fn unenroll_student(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    student_id: SafeStudentIdI64,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .unenroll_student(&req, course_id.0, student_id.0)
        .await
}

pub async fn create_assignment(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    assignment_data: web::Json<CreateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .create_assignment(&req, course_id.0, assignment_data.into_inner())
        .await
}

pub async fn list_announcements(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    query: web::Query<AnnouncementListParams>,
) -> ActixResult<HttpResponse> {
    ANNOUNCEMENT_SERVICE
        .list_announcements(&req, course_id.0, query.into_inner())
        .await
}

pub async fn create_announcement(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    announcement_data: web::Json<CreateAnnouncementRequest>,
) -> ActixResult<HttpResponse> {
    ANNOUNCEMENT_SERVICE
        .create_announcement(&req, course_id.0, announcement_data.into_inner())
        .await
}

pub async fn export_grades(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE.export_course_grades(&req, course_id.0).await
}

// 配置路由
pub fn configure_course_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/courses")
            .wrap(middlewares::RequireJWT)
            .service(
                // 学生看已选/可选课程，讲师看自己的课程，管理员看全部
                web::resource("").route(web::get().to(list_courses)).route(
                    web::post()
                        .to(create_course)
                        .wrap(middlewares::RequireRole::new_any(UserRole::lecturer_roles())),
                ),
            )
            .service(
                web::resource("/{course_id}")
                    .route(web::get().to(get_course))
                    .route(
                        web::put()
                            .to(update_course)
                            .wrap(middlewares::RequireCourseLecturer),
                    ),
            )
            .service(
                // 以下均限授课讲师或管理员
                web::resource("/{course_id}/students")
                    .wrap(middlewares::RequireCourseLecturer)
                    .route(web::get().to(list_students))
                    .route(web::post().to(enroll_students)),
            )
            .service(
                web::resource("/{course_id}/students/{student_id}")
                    .wrap(middlewares::RequireCourseLecturer)
                    .route(web::delete().to(unenroll_student)),
            )
            .service(
                web::resource("/{course_id}/available-students")
                    .wrap(middlewares::RequireCourseLecturer)
                    .route(web::get().to(list_available_students)),
            )
            .service(
                web::resource("/{course_id}/assignments")
                    .wrap(middlewares::RequireCourseLecturer)
                    .route(web::post().to(create_assignment)),
            )
            .service(
                web::resource("/{course_id}/grades/export")
                    .wrap(middlewares::RequireCourseLecturer)
                    .route(web::get().to(export_grades)),
            )
            .service(
                web::resource("/{course_id}/announcements")
                    .route(web::get().to(list_announcements))
                    .route(
                        web::post()
                            .to(create_announcement)
                            .wrap(middlewares::RequireRole::new_any(UserRole::lecturer_roles())),
                    ),
            ),
    );
}
