//! Fetches every page of a user's projects.
//!
//! The first page is fetched on its own since the page count is unknown until
//! it arrives. The remaining pages are fetched in parallel, at most
//! `max_concurrency` at a time, and appended to a shared result under a lock.
//! All spawned tasks are awaited before returning, even when one of them has
//! already failed, and a single failed page fails the whole fetch.

use crate::errors::ResolveError;
use crate::metrics_defs::{FETCH_DURATION, PAGES_FETCHED};
use crate::pages::PageFetcher;
use crate::types::{Pagination, Project};
use parking_lot::Mutex;
use shared::{counter, histogram};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;

/// Result of a single fan-out task: the page it fetched and the number of
/// projects it appended, or why it failed.
type PageTaskResult = (u32, Result<usize, crate::errors::ApiError>);

pub struct PaginationOrchestrator {
    fetcher: PageFetcher,
    max_concurrency: usize,
}

impl PaginationOrchestrator {
    pub fn new(fetcher: PageFetcher, max_concurrency: usize) -> Self {
        PaginationOrchestrator {
            fetcher,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn fetch_all(
        &self,
        username: &str,
        per_page: u32,
    ) -> Result<Vec<Project>, ResolveError> {
        let start = Instant::now();

        let first = self
            .fetcher
            .fetch_page(1, per_page, username)
            .await
            .map_err(|err| {
                counter!(PAGES_FETCHED, "outcome" => "error").increment(1);
                ResolveError::FirstPage(err)
            })?;
        counter!(PAGES_FETCHED, "outcome" => "ok").increment(1);

        let Pagination {
            next_page,
            total_pages,
            ..
        } = first.pagination;
        let projects = first.items;

        let projects = match (next_page, total_pages) {
            (_, Some(total)) if total >= 2 => {
                if next_page.is_none() {
                    tracing::warn!(
                        total,
                        "First page reported more pages but no next page, fetching them anyway"
                    );
                }
                self.fan_out(username, per_page, 2..=total, projects).await?
            }
            (Some(next), None) => self.walk(username, per_page, next, projects).await?,
            _ => projects,
        };

        let elapsed = start.elapsed();
        histogram!(FETCH_DURATION).record(elapsed.as_secs_f64());
        tracing::info!(
            username,
            total_pages = ?total_pages,
            projects = projects.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetched all project pages"
        );

        Ok(projects)
    }

    /// Fetches `pages` concurrently and appends them to `seed`.
    async fn fan_out(
        &self,
        username: &str,
        per_page: u32,
        pages: RangeInclusive<u32>,
        seed: Vec<Project>,
    ) -> Result<Vec<Project>, ResolveError> {
        tracing::debug!(
            username,
            first = *pages.start(),
            last = *pages.end(),
            max_concurrency = self.max_concurrency,
            "Fanning out page fetches"
        );

        let results = Arc::new(Mutex::new(seed));
        let mut join_set: JoinSet<PageTaskResult> = JoinSet::new();
        // Maps task IDs to pages so panicked tasks can be reported
        let mut task_pages = HashMap::new();
        let mut pending = pages;

        for page in pending.by_ref().take(self.max_concurrency) {
            let id = self.spawn_page(&mut join_set, &results, page, per_page, username);
            task_pages.insert(id, page);
        }

        let mut failures: Vec<(u32, ResolveError)> = Vec::new();

        // Wait for every task. Nothing is aborted early so no task can still
        // be writing to the results once this returns. Each finished task is
        // replaced by the next page, so at most `max_concurrency` are alive.
        while let Some(joined) = join_set.join_next_with_id().await {
            if let Some(page) = pending.next() {
                let id = self.spawn_page(&mut join_set, &results, page, per_page, username);
                task_pages.insert(id, page);
            }

            match joined {
                Ok((id, (page, Ok(count)))) => {
                    task_pages.remove(&id);
                    counter!(PAGES_FETCHED, "outcome" => "ok").increment(1);
                    tracing::debug!(page, count, "Fetched page");
                }
                Ok((id, (page, Err(source)))) => {
                    task_pages.remove(&id);
                    counter!(PAGES_FETCHED, "outcome" => "error").increment(1);
                    tracing::error!(page, error = %source, "Failed to fetch page");
                    failures.push((page, ResolveError::Page { page, source }));
                }
                Err(e) => {
                    counter!(PAGES_FETCHED, "outcome" => "error").increment(1);
                    let page = task_pages.remove(&e.id()).unwrap_or(u32::MAX);
                    tracing::error!(page, "Page fetch task failed: {e}");
                    failures.push((page, ResolveError::TaskFailed(format!("page {page}: {e}"))));
                }
            }
        }

        if let Some((_, err)) = failures.into_iter().min_by_key(|(page, _)| *page) {
            return Err(err);
        }

        Ok(std::mem::take(&mut *results.lock()))
    }

    fn spawn_page(
        &self,
        join_set: &mut JoinSet<PageTaskResult>,
        results: &Arc<Mutex<Vec<Project>>>,
        page: u32,
        per_page: u32,
        username: &str,
    ) -> Id {
        let fetcher = self.fetcher.clone();
        let results = results.clone();
        let username = username.to_string();

        join_set
            .spawn(async move {
                let outcome = fetcher
                    .fetch_page(page, per_page, &username)
                    .await
                    .map(|fetched| {
                        let count = fetched.items.len();
                        results.lock().extend(fetched.items);
                        count
                    });

                (page, outcome)
            })
            .id()
    }

    /// Follows `next_page` one page at a time. Used when the server does not
    /// report a page count, so the fan-out width is unknown.
    async fn walk(
        &self,
        username: &str,
        per_page: u32,
        next: u32,
        mut projects: Vec<Project>,
    ) -> Result<Vec<Project>, ResolveError> {
        tracing::debug!(username, "No page count reported, fetching sequentially");

        let mut next_page = Some(next);
        let mut previous = 1;

        while let Some(page) = next_page {
            if page <= previous {
                tracing::warn!(page, previous, "Pagination went backwards, stopping");
                break;
            }

            let fetched = self
                .fetcher
                .fetch_page(page, per_page, username)
                .await
                .map_err(|source| {
                    counter!(PAGES_FETCHED, "outcome" => "error").increment(1);
                    ResolveError::Page { page, source }
                })?;
            counter!(PAGES_FETCHED, "outcome" => "ok").increment(1);

            projects.extend(fetched.items);
            previous = page;
            next_page = fetched.pagination.next_page;
        }

        Ok(projects)
    }
}
