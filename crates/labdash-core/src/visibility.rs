//! Column visibility and the editor role gate

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capability level of the current user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Editor,
    #[default]
    Viewer,
}

/// Inputs for resolving which detail-table columns are shown
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnVisibilityPolicy {
    pub role: Role,
    pub default_visible: Vec<String>,
    /// Editor's explicit choice; `Some(vec![])` means the editor cleared it
    pub user_override: Option<Vec<String>>,
}

impl ColumnVisibilityPolicy {
    pub fn new(role: Role, default_visible: Vec<String>) -> Self {
        Self {
            role,
            default_visible,
            user_override: None,
        }
    }

    /// Set the user's column choice (builder pattern)
    pub fn with_override(mut self, columns: Vec<String>) -> Self {
        self.user_override = Some(columns);
        self
    }
}

/// Resolve the ordered list of visible columns.
///
/// Declared names missing from the table are dropped silently. A viewer always
/// gets the defaults; an editor gets the override whenever one was supplied,
/// including an explicitly empty one.
pub fn resolve_visible_columns(policy: &ColumnVisibilityPolicy, table_columns: &[String]) -> Vec<String> {
    let present = |names: &[String]| -> Vec<String> {
        names
            .iter()
            .filter(|name| table_columns.contains(name))
            .cloned()
            .collect()
    };

    match (policy.role, &policy.user_override) {
        (Role::Editor, Some(columns)) => present(columns),
        (Role::Viewer, Some(_)) => {
            debug!("column override ignored for viewer role");
            present(&policy.default_visible)
        }
        (_, None) => present(&policy.default_visible),
    }
}

/// Shared-secret gate deciding between editor and viewer
#[derive(Clone, Debug, Default)]
pub struct RoleGate {
    secret: Option<String>,
}

impl RoleGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Editor when the supplied secret equals the configured one
    pub fn role_for(&self, supplied: Option<&str>) -> Role {
        match (&self.secret, supplied) {
            (Some(secret), Some(supplied)) if secret == supplied => Role::Editor,
            _ => Role::Viewer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn viewer_gets_defaults_present_in_table() {
        let policy = ColumnVisibilityPolicy::new(Role::Viewer, names(&["A", "B", "C"]));
        assert_eq!(resolve_visible_columns(&policy, &names(&["C", "A"])), names(&["A", "C"]));
    }

    #[test]
    fn viewer_override_is_ignored() {
        let policy = ColumnVisibilityPolicy::new(Role::Viewer, names(&["A"]))
            .with_override(names(&["B"]));
        assert_eq!(resolve_visible_columns(&policy, &names(&["A", "B"])), names(&["A"]));
    }

    #[test]
    fn editor_explicit_clear_is_empty() {
        let policy = ColumnVisibilityPolicy::new(Role::Editor, names(&["A", "B"]))
            .with_override(Vec::new());
        assert!(resolve_visible_columns(&policy, &names(&["A", "B"])).is_empty());
    }

    #[test]
    fn editor_without_override_falls_back_to_defaults() {
        let policy = ColumnVisibilityPolicy::new(Role::Editor, names(&["A", "B"]));
        assert_eq!(resolve_visible_columns(&policy, &names(&["B"])), names(&["B"]));
    }

    #[test]
    fn editor_override_keeps_declared_order() {
        let policy = ColumnVisibilityPolicy::new(Role::Editor, names(&["A"]))
            .with_override(names(&["C", "Ghost", "A"]));
        assert_eq!(
            resolve_visible_columns(&policy, &names(&["A", "B", "C"])),
            names(&["C", "A"])
        );
    }

    #[test]
    fn role_gate_uses_plain_equality() {
        let gate = RoleGate::new(Some("s3cret".into()));
        assert_eq!(gate.role_for(Some("s3cret")), Role::Editor);
        assert_eq!(gate.role_for(Some("S3CRET")), Role::Viewer);
        assert_eq!(gate.role_for(None), Role::Viewer);
    }

    #[test]
    fn empty_secret_never_grants_editor() {
        let gate = RoleGate::new(Some(String::new()));
        assert_eq!(gate.role_for(Some("")), Role::Viewer);
        assert_eq!(RoleGate::default().role_for(Some("x")), Role::Viewer);
    }
}
