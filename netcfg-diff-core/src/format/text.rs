use crate::diff::Reconciliation;

/// Format changes as device commands, one per line.
///
/// Two commands that must be sent together are joined by `\N `.
pub fn format_text(result: &Reconciliation) -> String {
    let mut out = String::new();
    for chg in &result.changes {
        out.push_str(&chg.replacen('\n', "\\N ", 1));
        out.push('\n');
    }
    out
}

/// Format a simple summary of counts.
pub fn format_summary(result: &Reconciliation) -> String {
    let mut added = 0;
    let mut removed = 0;
    let mut other = 0;
    // Joined changes count each of their lines.
    for chg in result.changes.iter().flat_map(|c| c.split('\n')) {
        if chg.starts_with("no ") || chg.starts_with("clear configure ") {
            removed += 1;
        } else if chg == "exit" || chg.contains(" resequence ") {
            other += 1;
        } else {
            added += 1;
        }
    }
    format!(
        "added={added} removed={removed} mode={other} warnings={} notes={}",
        result.warnings.len(),
        result.notes.len()
    )
}
