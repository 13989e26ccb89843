use crate::config::GitlabConfig;
use crate::errors::ApiError;
use crate::types::{GroupId, GroupMember, ListProjectsOptions, Page, Pagination, Project};
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Header that makes GitLab execute the request as the named user.
pub const SUDO_HEADER: &str = "Sudo";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

const PAGE_HEADER: &str = "x-page";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const TOTAL_PAGES_HEADER: &str = "x-total-pages";
const PER_PAGE_HEADER: &str = "x-per-page";

/// The subset of the GitLab API used to resolve projects.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait GitlabApi: Send + Sync {
    /// Lists one page of projects, executed as the `sudo` user.
    async fn list_projects(
        &self,
        options: &ListProjectsOptions,
        sudo: &str,
    ) -> Result<Page<Project>, ApiError>;

    /// Lists the first page of direct members of a group.
    async fn list_group_members(
        &self,
        group: GroupId,
        per_page: u32,
    ) -> Result<Page<GroupMember>, ApiError>;
}

/// GitLab REST client authenticated with an admin token.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    api_url: Url,
    token: String,
}

impl HttpClient {
    pub fn new(config: &GitlabConfig) -> Result<Self, ApiError> {
        let api_url = format!("{}/api/v4/", config.url.as_str().trim_end_matches('/'));
        let api_url = Url::parse(&api_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(HttpClient {
            client,
            api_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.api_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
        sudo: Option<&str>,
    ) -> Result<Page<T>, ApiError> {
        let url = self.endpoint(resource)?;

        let mut request = self
            .client
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .query(query);

        if let Some(username) = sudo {
            request = request.header(SUDO_HEADER, username);
        }

        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ApiError::NotFound {
                    resource: resource.to_string(),
                });
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Status { status, body });
            }
        }

        let pagination = parse_pagination(response.headers())?;
        let items = response
            .json::<Vec<T>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        tracing::debug!(
            resource,
            page = pagination.current_page,
            total_pages = ?pagination.total_pages,
            items = items.len(),
            "Fetched page"
        );

        Ok(Page { items, pagination })
    }
}

#[async_trait]
impl GitlabApi for HttpClient {
    async fn list_projects(
        &self,
        options: &ListProjectsOptions,
        sudo: &str,
    ) -> Result<Page<Project>, ApiError> {
        self.get_page("projects", &options.query_pairs(), Some(sudo))
            .await
    }

    async fn list_group_members(
        &self,
        group: GroupId,
        per_page: u32,
    ) -> Result<Page<GroupMember>, ApiError> {
        let resource = format!("groups/{group}/members");
        self.get_page(&resource, &[("per_page", per_page.to_string())], None)
            .await
    }
}

fn header_u32(headers: &HeaderMap, name: &str) -> Result<Option<u32>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|e| ApiError::Decode(format!("{name}: {e}")))?
        .trim();

    // GitLab sends an empty X-Next-Page on the last page
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse()
        .map(Some)
        .map_err(|e| ApiError::Decode(format!("{name}: {e}")))
}

fn parse_pagination(headers: &HeaderMap) -> Result<Pagination, ApiError> {
    Ok(Pagination {
        current_page: header_u32(headers, PAGE_HEADER)?.unwrap_or(1),
        next_page: header_u32(headers, NEXT_PAGE_HEADER)?,
        total_pages: header_u32(headers, TOTAL_PAGES_HEADER)?,
        per_page: header_u32(headers, PER_PAGE_HEADER)?.unwrap_or(0),
    })
}
