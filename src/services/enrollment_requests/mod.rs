pub mod create;
pub mod list;
pub mod review;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::enrollments::requests::{
    CreateEnrollmentRequest, EnrollmentRequestQueryParams,
};
use crate::storage::Storage;

pub struct EnrollmentRequestService {
    storage: Option<Arc<dyn Storage>>,
}

impl EnrollmentRequestService {
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

    // 学生提交申请
    pub async fn create_request(
        &self,
        request: &HttpRequest,
        create_data: CreateEnrollmentRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_request(self, request, create_data).await
    }

    pub async fn list_requests(
        &self,
        request: &HttpRequest,
        query: EnrollmentRequestQueryParams,
    ) -> ActixResult<HttpResponse> {
        list::list_requests(self, request, query).await
    }

    pub async fn approve_request(&self, request: &HttpRequest, id: i64) -> ActixResult<HttpResponse> {
        review::review_request(self, request, id, true).await
    }

    pub async fn reject_request(&self, request: &HttpRequest, id: i64) -> ActixResult<HttpResponse> {
        review::review_request(self, request, id, false).await
    }
}
