use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A concrete endpoint for a named, versioned service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub service: String,
    pub version: String,
    pub address: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            address: address.into(),
            properties: HashMap::new(),
        }
    }

    /// Whether this node can serve a request for `requested` version.
    ///
    /// Versions are `major[.minor]`. A node is compatible when the major
    /// numbers match and its minor is at least the requested minor.
    /// Unparseable versions only match themselves exactly.
    pub fn satisfies(&self, requested: &str) -> bool {
        match (parse_version(&self.version), parse_version(requested)) {
            (Some((offered_major, offered_minor)), Some((want_major, want_minor))) => {
                offered_major == want_major && offered_minor >= want_minor
            }
            _ => self.version == requested,
        }
    }
}

fn parse_version(raw: &str) -> Option<(u64, u64)> {
    let mut parts = raw.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_major_higher_minor_is_compatible() {
        let node = Node::new("service1", "1.2", "http://a");
        assert!(node.satisfies("1.0"));
        assert!(node.satisfies("1.2"));
        assert!(node.satisfies("1"));
        assert!(!node.satisfies("1.3"));
    }

    #[test]
    fn different_major_is_incompatible() {
        let node = Node::new("service1", "2.0", "http://a");
        assert!(!node.satisfies("1.0"));
        assert!(!node.satisfies("3.0"));
    }

    #[test]
    fn patch_component_is_ignored() {
        let node = Node::new("service1", "1.4.7", "http://a");
        assert!(node.satisfies("1.4"));
    }

    #[test]
    fn non_numeric_versions_match_exactly() {
        let node = Node::new("service1", "beta", "http://a");
        assert!(node.satisfies("beta"));
        assert!(!node.satisfies("1.0"));
    }
}
