pub mod create;
pub mod list;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::feedback::requests::{CreateFeedbackRequest, FeedbackListParams};
use crate::storage::Storage;

pub struct FeedbackService {
    storage: Option<Arc<dyn Storage>>,
}

impl FeedbackService {
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

    pub async fn create_feedback(
        &self,
        request: &HttpRequest,
        feedback_data: CreateFeedbackRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_feedback(self, request, feedback_data).await
    }

    pub async fn list_feedback(
        &self,
        request: &HttpRequest,
        query: FeedbackListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_feedback(self, request, query).await
    }

    pub async fn mark_read(&self, request: &HttpRequest, id: i64) -> ActixResult<HttpResponse> {
        list::mark_feedback_read(self, request, id).await
    }
}
