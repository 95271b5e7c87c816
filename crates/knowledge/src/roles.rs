//! Requester role normalization.

use crate::types::GENERAL_ROLE;

/// Canonical form of a role or department path component.
pub fn normalize_role(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Maps a caller-supplied role onto a role the index knows about.
///
/// With an empty list of known roles any non-empty role is accepted as-is.
/// Missing, blank or unknown roles fall back to `general`, which only grants
/// access to documents shared with everyone.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    known: Vec<String>,
}

impl RoleResolver {
    pub fn new<I, S>(known_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known: Vec<String> = known_roles
            .into_iter()
            .map(|r| normalize_role(r.as_ref()))
            .filter(|r| !r.is_empty())
            .collect();
        known.sort();
        known.dedup();
        Self { known }
    }

    pub fn resolve(&self, requested: Option<&str>) -> String {
        let role = requested.map(normalize_role).unwrap_or_default();
        if role.is_empty() {
            return GENERAL_ROLE.to_string();
        }

        if self.known.is_empty() || self.known.iter().any(|k| k == &role) {
            role
        } else {
            tracing::warn!(role = %role, "Unknown requester role, falling back to general");
            GENERAL_ROLE.to_string()
        }
    }
}
