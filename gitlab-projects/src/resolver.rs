use crate::client::{GitlabApi, HttpClient};
use crate::config::{Config, ResolverConfig};
use crate::errors::{ApiError, ResolveError};
use crate::metrics_defs::PROJECTS_RESOLVED;
use crate::orchestrator::PaginationOrchestrator;
use crate::pages::PageFetcher;
use crate::privilege::PrivilegeResolver;
use crate::retry::RetryPolicy;
use crate::transform::transform;
use crate::types::GroupId;
use shared::histogram;
use std::sync::Arc;
use tokio::time::Instant;

/// Resolves the project claims of a user.
pub struct ProjectResolver {
    orchestrator: PaginationOrchestrator,
    privilege: PrivilegeResolver,
    page_size: u32,
}

impl ProjectResolver {
    pub fn new(client: Arc<dyn GitlabApi>, config: &ResolverConfig) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self::with_retry_policy(client, config, retry)
    }

    /// Like `new`, with a retry policy that replaces the configured one.
    pub fn with_retry_policy(
        client: Arc<dyn GitlabApi>,
        config: &ResolverConfig,
        retry: RetryPolicy,
    ) -> Self {
        let fetcher = PageFetcher::new(client.clone(), retry.clone());

        ProjectResolver {
            orchestrator: PaginationOrchestrator::new(fetcher, config.max_concurrency),
            privilege: PrivilegeResolver::new(client, retry, config.privilege_failure_policy),
            page_size: config.page_size,
        }
    }

    /// Builds a resolver talking to the configured GitLab instance.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = HttpClient::new(&config.gitlab)?;
        Ok(Self::new(Arc::new(client), &config.resolver))
    }

    /// Returns every project path `username` has developer access to,
    /// lower-cased and prefixed with `admin:` if the user is a member of one
    /// of `privileged_groups`. Order is unspecified and duplicates are kept.
    pub async fn get_user_projects(
        &self,
        username: &str,
        privileged_groups: &[GroupId],
    ) -> Result<Vec<String>, ResolveError> {
        let start = Instant::now();

        let privileged = if privileged_groups.is_empty() {
            false
        } else {
            self.privilege
                .is_privileged(username, privileged_groups)
                .await?
        };

        let projects = self.orchestrator.fetch_all(username, self.page_size).await?;

        let paths: Vec<String> = projects
            .iter()
            .map(|project| transform(&project.path_with_namespace, privileged))
            .collect();

        histogram!(PROJECTS_RESOLVED).record(paths.len() as f64);
        tracing::info!(
            username,
            privileged,
            projects = paths.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolved user projects"
        );

        Ok(paths)
    }
}

/// Resolves the project claims of `username` with the default settings.
pub async fn get_user_projects(
    client: Arc<dyn GitlabApi>,
    username: &str,
    privileged_groups: &[GroupId],
) -> Result<Vec<String>, ResolveError> {
    ProjectResolver::new(client, &ResolverConfig::default())
        .get_user_projects(username, privileged_groups)
        .await
}
