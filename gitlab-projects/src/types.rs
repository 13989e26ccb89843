use serde::Deserialize;

pub type GroupId = u64;

/// A project as returned by the projects listing. Only the path is consulted.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub path_with_namespace: String,
}

impl Project {
    pub fn new<P: Into<String>>(path_with_namespace: P) -> Self {
        Project {
            path_with_namespace: path_with_namespace.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    pub username: String,
}

impl GroupMember {
    pub fn new<U: Into<String>>(username: U) -> Self {
        GroupMember {
            username: username.into(),
        }
    }
}

/// Pagination metadata reported alongside each page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    // None on the last page
    pub next_page: Option<u32>,
    // None when the server does not count the collection
    pub total_pages: Option<u32>,
    pub per_page: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// GitLab's numeric access level for the Developer role.
pub const DEVELOPER_ACCESS_LEVEL: u32 = 30;

/// Query options for the projects listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListProjectsOptions {
    pub page: u32,
    pub per_page: u32,
    pub simple: bool,
    pub membership: bool,
    pub min_access_level: u32,
}

impl ListProjectsOptions {
    /// Projects the user is a member of with at least developer access.
    pub fn developer_memberships(page: u32, per_page: u32) -> Self {
        ListProjectsOptions {
            page,
            per_page,
            simple: true,
            membership: true,
            min_access_level: DEVELOPER_ACCESS_LEVEL,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("simple", self.simple.to_string()),
            ("membership", self.membership.to_string()),
            ("min_access_level", self.min_access_level.to_string()),
        ]
    }
}
