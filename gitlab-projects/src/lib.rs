//! Resolves the GitLab projects a user can access, for use as group claims.
//!
//! Projects are listed as the user through the `Sudo` header, with pages
//! after the first fetched in parallel. Users in a privileged group get every
//! path prefixed with `admin:`.

pub mod client;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod orchestrator;
pub mod pages;
pub mod privilege;
pub mod resolver;
pub mod retry;
pub mod transform;
pub mod types;

#[cfg(test)]
mod testutils;

pub use client::{GitlabApi, HttpClient};
pub use errors::{ApiError, ResolveError};
pub use resolver::{ProjectResolver, get_user_projects};
