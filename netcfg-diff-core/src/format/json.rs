use crate::diff::Reconciliation;

/// Format a reconciliation as JSON.
pub fn format_json(result: &Reconciliation) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}
