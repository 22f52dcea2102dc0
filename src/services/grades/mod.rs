pub mod create;
pub mod export;
pub mod list;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::CourseHubError;
use crate::models::ErrorCode;
use crate::models::grades::requests::{
    BulkGradeRequest, CreateGradeRequest, GradeListParams, UpdateGradeRequest,
};
use crate::services::storage_error_response;
use crate::storage::Storage;

pub struct GradeService {
    storage: Option<Arc<dyn Storage>>,
}

impl GradeService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    // 单个评分
    pub async fn create_grade(
        &self,
        request: &HttpRequest,
        grade_data: CreateGradeRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_grade(self, request, grade_data).await
    }

    // 快速录入
    pub async fn bulk_save_grades(
        &self,
        request: &HttpRequest,
        bulk_data: BulkGradeRequest,
    ) -> ActixResult<HttpResponse> {
        create::bulk_save_grades(self, request, bulk_data).await
    }

    pub async fn update_grade(
        &self,
        request: &HttpRequest,
        id: i64,
        update_data: UpdateGradeRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_grade(self, request, id, update_data).await
    }

    pub async fn publish_grade(&self, request: &HttpRequest, id: i64) -> ActixResult<HttpResponse> {
        update::publish_grade(self, request, id).await
    }

    pub async fn get_grade(&self, request: &HttpRequest, id: i64) -> ActixResult<HttpResponse> {
        list::get_grade(self, request, id).await
    }

    pub async fn list_grades(
        &self,
        request: &HttpRequest,
        query: GradeListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_grades(self, request, query).await
    }

    // 导出课程成绩表
    pub async fn export_course_grades(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        export::export_course_grades(self, request, course_id).await
    }
}

/// 成绩写操作的错误码
pub(crate) fn grade_error_response(context: &str, err: CourseHubError) -> HttpResponse {
    let code = match &err {
        CourseHubError::Validation(_) => ErrorCode::GradeInvalidMarks,
        CourseHubError::InvalidTransition(_) => ErrorCode::GradeInvalidTransition,
        CourseHubError::Conflict(_) => ErrorCode::GradeAlreadyExists,
        CourseHubError::NotFound(_) => ErrorCode::GradeNotFound,
        _ => ErrorCode::InternalServerError,
    };
    storage_error_response(context, err, code)
}
