use serde::{Deserialize, Serialize};

/// Outcome of reconciling a device configuration with its target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Device commands in the order they must be sent.
    ///
    /// An entry holds two commands separated by a newline if both must be
    /// sent together.
    pub changes: Vec<String>,
    /// Findings that should be looked at, but don't prevent the changes.
    pub warnings: Vec<String>,
    /// Informational messages, e.g. about parts left untouched.
    pub notes: Vec<String>,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Thresholds of heuristics used during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// An object-group on device is changed incrementally only if the
    /// number of added and removed members is at most this factor times
    /// the number of members in target. Otherwise a new group is created.
    pub object_group_edit_ratio: f64,
    /// Maximum number of lines inserted at one position of an IOS
    /// access-list. Values above 9999 are capped.
    pub acl_insert_limit: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            object_group_edit_ratio: 1.0,
            acl_insert_limit: 9999,
        }
    }
}
