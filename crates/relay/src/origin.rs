//! Origin allow-list for WebSocket upgrades

use std::collections::HashSet;

/// Exact-match `Origin` policy
///
/// An empty list allows every origin, including a missing header. A
/// non-empty list requires the header and an exact match.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows_all(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            _ if self.allows_all() => true,
            None => false,
            Some(origin) => self.allowed.contains(origin),
        }
    }
}
