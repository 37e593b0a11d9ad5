//! Permission strings of the form `resource:operation`.

use crate::boundary::AccessControlMatrix;
use crate::context::TenantSecurityContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wildcard segment.
pub const WILDCARD: &str = "*";

/// A set of granted permission strings.
///
/// `resource:op` grants one operation, `resource:*` every operation on a
/// resource type, and `*:*` everything.
///
/// # Example
///
/// ```
/// use tenantguard_security::access::PermissionSet;
///
/// let perms = PermissionSet::from_iter(["cart:read", "order:*"]);
/// assert!(perms.grants("cart", "read"));
/// assert!(perms.grants("order", "delete"));
/// assert!(!perms.grants("cart", "write"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    grants: BTreeSet<String>,
}

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context permissions united with the permissions of the context's role.
    #[must_use]
    pub fn effective(context: &TenantSecurityContext, matrix: &AccessControlMatrix) -> Self {
        context
            .permissions
            .iter()
            .chain(matrix.role_permissions(context.role))
            .cloned()
            .collect()
    }

    /// Adds a permission.
    pub fn insert(&mut self, permission: impl Into<String>) {
        self.grants.insert(permission.into());
    }

    /// Returns true if the exact string is present.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.grants.contains(permission)
    }

    /// Returns true if the set grants `operation` on `resource_type`.
    #[must_use]
    pub fn grants(&self, resource_type: &str, operation: &str) -> bool {
        self.contains(&format!("{resource_type}:{operation}"))
            || self.contains(&format!("{resource_type}:{WILDCARD}"))
            || self.contains(&format!("{WILDCARD}:{WILDCARD}"))
    }

    /// Returns true if `required` is satisfied, honouring wildcards for
    /// `resource:operation` strings.
    #[must_use]
    pub fn satisfies(&self, required: &str) -> bool {
        match required.split_once(':') {
            Some((resource, operation)) => self.grants(resource, operation),
            None => self.contains(required),
        }
    }

    /// Returns the required permissions that are not satisfied.
    #[must_use]
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|r| !self.satisfies(r))
            .collect()
    }

    /// Returns true if every required permission is satisfied.
    #[must_use]
    pub fn contains_all(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.satisfies(r))
    }

    /// Number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Iterates over the permissions in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.grants.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().map(Into::into).collect(),
        }
    }
}
