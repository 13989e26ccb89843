/// Marks project paths of users in a privileged group.
pub const PRIVILEGE_PREFIX: &str = "admin:";

/// Returns the claim for a project path: lower-cased and prefixed when privileged.
pub fn transform(path: &str, privileged: bool) -> String {
    if privileged {
        format!("{PRIVILEGE_PREFIX}{path}").to_lowercase()
    } else {
        path.to_lowercase()
    }
}
