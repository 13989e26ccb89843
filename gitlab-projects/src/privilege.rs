use crate::client::GitlabApi;
use crate::config::{MAX_PAGE_SIZE, PrivilegeFailurePolicy};
use crate::errors::ResolveError;
use crate::metrics_defs::PRIVILEGE_LOOKUP_FAILURES;
use crate::retry::RetryPolicy;
use crate::types::GroupId;
use shared::counter;
use std::sync::Arc;

/// Decides whether a user belongs to any of the privileged groups.
///
/// Groups are checked one after the other and only the first page of members
/// (up to 100) of each group is examined, so members beyond that are not
/// recognised.
pub struct PrivilegeResolver {
    client: Arc<dyn GitlabApi>,
    retry: RetryPolicy,
    failure_policy: PrivilegeFailurePolicy,
}

impl PrivilegeResolver {
    pub fn new(
        client: Arc<dyn GitlabApi>,
        retry: RetryPolicy,
        failure_policy: PrivilegeFailurePolicy,
    ) -> Self {
        PrivilegeResolver {
            client,
            retry,
            failure_policy,
        }
    }

    pub async fn is_privileged(
        &self,
        username: &str,
        groups: &[GroupId],
    ) -> Result<bool, ResolveError> {
        for &group in groups {
            let context = format!("group {group} members");
            let lookup = self
                .retry
                .call(&context, || {
                    self.client.list_group_members(group, MAX_PAGE_SIZE)
                })
                .await;

            let members = match lookup {
                Ok(page) => page.items,
                Err(source) => {
                    counter!(PRIVILEGE_LOOKUP_FAILURES).increment(1);
                    match self.failure_policy {
                        PrivilegeFailurePolicy::FailClosed => {
                            tracing::error!(group, error = %source, "Privileged group lookup failed, aborting");
                            return Err(ResolveError::Privilege { group, source });
                        }
                        PrivilegeFailurePolicy::Inconclusive => {
                            tracing::error!(group, error = %source, "Privileged group lookup failed, skipping group");
                            continue;
                        }
                    }
                }
            };

            if members.iter().any(|m| m.username == username) {
                tracing::debug!(username, group, "User is a member of a privileged group");
                return Ok(true);
            }
        }

        Ok(false)
    }
}
