use colored::Colorize;
use netcfg_diff_core::{format_summary, format_text, Reconciliation};

/// Kind of a device command, used for coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
    Clear,
    Mode,
}

pub fn classify(line: &str) -> ChangeKind {
    let line = line.trim_start();
    if line.starts_with("clear configure ") {
        ChangeKind::Clear
    } else if line.starts_with("no ") {
        ChangeKind::Remove
    } else if line == "exit" || line.contains(" resequence ") {
        ChangeKind::Mode
    } else {
        ChangeKind::Add
    }
}

/// Render changes for terminal output.
pub fn render_changes(result: &Reconciliation) -> String {
    let raw = format_text(result);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = match classify(line) {
            ChangeKind::Add => line.green().to_string(),
            ChangeKind::Remove => line.red().to_string(),
            ChangeKind::Clear => line.magenta().to_string(),
            ChangeKind::Mode => line.yellow().to_string(),
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(result: &Reconciliation) -> String {
    format_summary(result).cyan().to_string()
}

pub fn compare_info(result: &Reconciliation) -> &'static str {
    if result.has_changes() {
        "comp: *** device changed ***"
    } else {
        "comp: device unchanged"
    }
}
