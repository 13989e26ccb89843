use crate::client::GitlabApi;
use crate::config::MAX_PAGE_SIZE;
use crate::errors::ApiError;
use crate::retry::RetryPolicy;
use crate::types::{ListProjectsOptions, Page, Project};
use std::sync::Arc;

/// Fetches single pages of the projects a user is a developer of.
#[derive(Clone)]
pub struct PageFetcher {
    client: Arc<dyn GitlabApi>,
    retry: RetryPolicy,
}

impl PageFetcher {
    pub fn new(client: Arc<dyn GitlabApi>, retry: RetryPolicy) -> Self {
        PageFetcher { client, retry }
    }

    pub async fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
        username: &str,
    ) -> Result<Page<Project>, ApiError> {
        if page == 0 {
            return Err(ApiError::InvalidRequest("page numbers start at 1".into()));
        }
        if per_page == 0 || per_page > MAX_PAGE_SIZE {
            return Err(ApiError::InvalidRequest(format!(
                "per_page must be between 1 and {MAX_PAGE_SIZE}, got {per_page}"
            )));
        }

        let options = ListProjectsOptions::developer_memberships(page, per_page);
        let context = format!("projects page {page}");

        self.retry
            .call(&context, || self.client.list_projects(&options, username))
            .await
    }
}
