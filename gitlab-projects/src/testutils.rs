use crate::client::GitlabApi;
use crate::errors::ApiError;
use crate::types::{GroupId, GroupMember, ListProjectsOptions, Page, Pagination, Project};
use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub enum PageFailure {
    /// 404 on every attempt
    NotFound,
    /// 503 for the given number of attempts, then success
    Transient(u32),
    /// 429 for the given number of attempts, then success
    RateLimited(u32),
    /// 503 on every attempt
    Always,
}

/// In-memory GitLab serving a fixed set of project pages and group memberships.
#[derive(Default)]
pub struct MockGitlab {
    pages: Vec<Vec<Project>>,
    omit_total: bool,
    reported_total: Option<u32>,
    next_page_override: Option<Option<u32>>,
    latency: Duration,
    failures: Mutex<HashMap<u32, PageFailure>>,
    groups: HashMap<GroupId, Vec<GroupMember>>,
    broken_groups: HashMap<GroupId, bool>,
    project_calls: Mutex<HashMap<u32, u32>>,
    sudo_users: Mutex<Vec<String>>,
    member_calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    max_alive_tasks: AtomicUsize,
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: String::new(),
    }
}

impl MockGitlab {
    /// One page per entry, with mixed case paths like `Group-2/Project-7`.
    pub fn with_page_sizes(sizes: &[usize]) -> Self {
        let pages = sizes
            .iter()
            .enumerate()
            .map(|(page, size)| {
                (0..*size)
                    .map(|i| Project::new(format!("Group-{}/Project-{i}", page + 1)))
                    .collect()
            })
            .collect();

        MockGitlab {
            pages,
            ..Default::default()
        }
    }

    pub fn fail_page(self, page: u32, failure: PageFailure) -> Self {
        self.failures.lock().insert(page, failure);
        self
    }

    /// Behave like GitLab on very large collections: no total page count.
    pub fn without_total(mut self) -> Self {
        self.omit_total = true;
        self
    }

    /// Report `total` pages regardless of how many hold projects.
    pub fn with_total_pages(mut self, total: u32) -> Self {
        self.reported_total = Some(total);
        self
    }

    /// Send `next` as the next page on every response.
    pub fn with_next_page(mut self, next: Option<u32>) -> Self {
        self.next_page_override = Some(next);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_group(mut self, group: GroupId, usernames: &[&str]) -> Self {
        self.groups.insert(
            group,
            usernames.iter().map(|u| GroupMember::new(*u)).collect(),
        );
        self
    }

    /// `not_found` selects between a 404 and a persistent 503.
    pub fn with_broken_group(mut self, group: GroupId, not_found: bool) -> Self {
        self.broken_groups.insert(group, not_found);
        self
    }

    pub fn project_calls(&self, page: u32) -> u32 {
        self.project_calls.lock().get(&page).copied().unwrap_or(0)
    }

    pub fn total_project_calls(&self) -> u32 {
        self.project_calls.lock().values().sum()
    }

    pub fn sudo_users(&self) -> Vec<String> {
        self.sudo_users.lock().clone()
    }

    pub fn member_calls(&self) -> u32 {
        self.member_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of runtime tasks alive during any projects call.
    pub fn max_alive_tasks(&self) -> usize {
        self.max_alive_tasks.load(Ordering::SeqCst)
    }

    fn project_page(&self, page: u32, per_page: u32) -> Result<Page<Project>, ApiError> {
        let attempt = {
            let mut calls = self.project_calls.lock();
            let count = calls.entry(page).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(failure) = self.failures.lock().get(&page) {
            match failure {
                PageFailure::NotFound => {
                    return Err(ApiError::NotFound {
                        resource: "projects".into(),
                    });
                }
                PageFailure::Transient(failing) if attempt <= *failing => {
                    return Err(unavailable());
                }
                PageFailure::RateLimited(failing) if attempt <= *failing => {
                    return Err(ApiError::Status {
                        status: StatusCode::TOO_MANY_REQUESTS,
                        body: "Retry later".into(),
                    });
                }
                PageFailure::Transient(_) | PageFailure::RateLimited(_) => {}
                PageFailure::Always => return Err(unavailable()),
            }
        }

        let total = self
            .reported_total
            .unwrap_or(self.pages.len().max(1) as u32);
        let items = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();

        Ok(Page {
            items,
            pagination: Pagination {
                current_page: page,
                next_page: self
                    .next_page_override
                    .unwrap_or((page < total).then_some(page + 1)),
                total_pages: (!self.omit_total).then_some(total),
                per_page,
            },
        })
    }
}

#[async_trait]
impl GitlabApi for MockGitlab {
    async fn list_projects(
        &self,
        options: &ListProjectsOptions,
        sudo: &str,
    ) -> Result<Page<Project>, ApiError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let alive = tokio::runtime::Handle::current()
            .metrics()
            .num_alive_tasks();
        self.max_alive_tasks.fetch_max(alive, Ordering::SeqCst);
        self.sudo_users.lock().push(sudo.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = self.project_page(options.page, options.per_page);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_group_members(
        &self,
        group: GroupId,
        per_page: u32,
    ) -> Result<Page<GroupMember>, ApiError> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);

        match self.broken_groups.get(&group) {
            Some(true) => {
                return Err(ApiError::NotFound {
                    resource: format!("groups/{group}/members"),
                });
            }
            Some(false) => return Err(unavailable()),
            None => {}
        }

        let members = self
            .groups
            .get(&group)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("groups/{group}/members"),
            })?;

        Ok(Page {
            items: members,
            pagination: Pagination {
                current_page: 1,
                next_page: None,
                total_pages: Some(1),
                per_page,
            },
        })
    }
}
