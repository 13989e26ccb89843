use crate::types::GroupId;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// GitLab's upper bound for `per_page`.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("page_size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),

    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("retry.max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("gitlab token is empty")]
    EmptyToken,
}

/// Project resolution configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub gitlab: GitlabConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.gitlab.validate()?;
        self.resolver.validate()
    }
}

/// Connection settings for the GitLab API
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GitlabConfig {
    /// Base URL of the GitLab instance, without the `/api/v4` suffix
    pub url: Url,
    /// Admin token. It must be allowed to impersonate users through the `Sudo` header.
    pub token: String,
    /// Deadline for a single HTTP request, retries get a fresh deadline
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GitlabConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.token.trim().is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        Ok(())
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// What to do when the members of a privileged group cannot be listed
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeFailurePolicy {
    /// Log the failure and treat the user as not privileged through that group
    #[default]
    Inconclusive,
    /// Abort the resolution
    FailClosed,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Membership in any of these groups marks every project path as privileged
    #[serde(default)]
    pub privileged_groups: Vec<GroupId>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Upper bound on page fetches in flight for one resolution
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub privilege_failure_policy: PrivilegeFailurePolicy,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            privileged_groups: Vec::new(),
            page_size: default_page_size(),
            max_concurrency: default_max_concurrency(),
            privilege_failure_policy: PrivilegeFailurePolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ResolverConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidPageSize(self.page_size));
        }
        if self.max_concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts);
        }
        Ok(())
    }
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_concurrency() -> usize {
    8
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = r#"
            gitlab:
                url: https://gitlab.example.com
                token: secret
            "#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.gitlab.url.as_str(), "https://gitlab.example.com/");
        assert_eq!(config.gitlab.request_timeout_secs, 30);
        assert_eq!(config.resolver, ResolverConfig::default());
        assert_eq!(config.resolver.page_size, 100);
        assert_eq!(config.resolver.retry.max_attempts, 3);
        assert_eq!(
            config.resolver.privilege_failure_policy,
            PrivilegeFailurePolicy::Inconclusive
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
            gitlab:
                url: https://gitlab.example.com
                token: secret
                request_timeout_secs: 5
            resolver:
                privileged_groups: [42, 7]
                page_size: 50
                max_concurrency: 2
                privilege_failure_policy: fail_closed
                retry:
                    max_attempts: 5
                    base_delay_ms: 100
            "#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.resolver.privileged_groups, vec![42, 7]);
        assert_eq!(config.resolver.page_size, 50);
        assert_eq!(config.resolver.max_concurrency, 2);
        assert_eq!(
            config.resolver.privilege_failure_policy,
            PrivilegeFailurePolicy::FailClosed
        );
        assert_eq!(
            config.resolver.retry,
            RetryConfig {
                max_attempts: 5,
                base_delay_ms: 100,
                max_delay_ms: 5000,
            }
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let yaml = r#"
            gitlab:
                url: not a url
                token: secret
            "#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validation() {
        let base: Config = serde_yaml::from_str(
            r#"
            gitlab:
                url: https://gitlab.example.com
                token: secret
            "#,
        )
        .unwrap();

        let mut config = base.clone();
        config.resolver.page_size = 0;
        assert_eq!(config.validate(), Err(ValidationError::InvalidPageSize(0)));

        let mut config = base.clone();
        config.resolver.page_size = 101;
        assert_eq!(config.validate(), Err(ValidationError::InvalidPageSize(101)));

        let mut config = base.clone();
        config.resolver.max_concurrency = 0;
        assert_eq!(config.validate(), Err(ValidationError::InvalidConcurrency));

        let mut config = base.clone();
        config.resolver.retry.max_attempts = 0;
        assert_eq!(config.validate(), Err(ValidationError::InvalidMaxAttempts));

        let mut config = base;
        config.gitlab.token = "  ".into();
        assert_eq!(config.validate(), Err(ValidationError::EmptyToken));
    }
}
