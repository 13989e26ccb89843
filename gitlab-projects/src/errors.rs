use crate::types::GroupId;
use http::StatusCode;
use thiserror::Error;

/// Errors returned by a single call to the GitLab API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Errors that can never succeed on retry regardless of the policy in use.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ApiError::InvalidUrl(_) | ApiError::InvalidRequest(_))
    }
}

/// Errors that abort resolving the projects of a user. Any of these means the
/// call produced no usable result.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to fetch the first page of projects: {0}")]
    FirstPage(#[source] ApiError),

    #[error("failed to fetch page {page} of projects: {source}")]
    Page {
        page: u32,
        #[source]
        source: ApiError,
    },

    #[error("page fetch task failed: {0}")]
    TaskFailed(String),

    #[error("failed to look up members of group {group}: {source}")]
    Privilege {
        group: GroupId,
        #[source]
        source: ApiError,
    },
}
