//! Metrics definitions for project resolution.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_RETRY: MetricDef = MetricDef {
    name: "gitlab.request.retry",
    metric_type: MetricType::Counter,
    description: "Number of GitLab API calls that failed and were retried",
};

pub const PAGES_FETCHED: MetricDef = MetricDef {
    name: "gitlab.pages.fetched",
    metric_type: MetricType::Counter,
    description: "Number of project listing pages fetched, tagged by outcome",
};

pub const FETCH_DURATION: MetricDef = MetricDef {
    name: "gitlab.fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch every project page of a user in seconds",
};

pub const PROJECTS_RESOLVED: MetricDef = MetricDef {
    name: "gitlab.projects.resolved",
    metric_type: MetricType::Histogram,
    description: "Number of project paths returned for a user",
};

pub const PRIVILEGE_LOOKUP_FAILURES: MetricDef = MetricDef {
    name: "gitlab.privilege.lookup_failures",
    metric_type: MetricType::Counter,
    description: "Number of privileged group member lookups that failed",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_RETRY,
    PAGES_FETCHED,
    FETCH_DURATION,
    PROJECTS_RESOLVED,
    PRIVILEGE_LOOKUP_FAILURES,
];
