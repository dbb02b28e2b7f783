//! Approved x402 extension header registry.
//!
//! Extension headers ride alongside the core payment headers inside the AAD.
//! Only names from the approved registry are accepted; matching is
//! case-insensitive and the canonical casing is what gets stored and
//! authenticated. Applications that need additional approved names configure
//! them per codec instance through [`crate::HpkeBuilder`] rather than through
//! any process-wide state.

/// Extension header names approved for x402 v1.
pub const APPROVED_EXTENSION_HEADERS: [&str; 5] = [
    "X-402-Routing",
    "X-402-Limits",
    "X-402-Acceptable",
    "X-402-Metadata",
    "X-402-Security",
];

/// Per-instance registry of approved extension header names.
#[derive(Clone, Debug)]
pub struct ExtensionRegistry {
    names: Vec<String>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExtensionRegistry {
    /// Registry containing only the compiled-in approved names.
    pub fn builtin() -> Self {
        Self {
            names: APPROVED_EXTENSION_HEADERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Add an application-approved extension header name.
    ///
    /// The name is stored as given; matching stays case-insensitive. Adding a
    /// name that is already approved (under any casing) is a no-op.
    pub fn approve(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.canonicalize(&name).is_none() {
            self.names.push(name);
        }
        self
    }

    /// Whether `name` matches an approved header, case-insensitively.
    pub fn is_approved(&self, name: &str) -> bool {
        self.canonicalize(name).is_some()
    }

    /// Canonical casing for `name`, or `None` if it is not approved.
    pub fn canonicalize(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .map(|n| n.as_str())
    }
}
