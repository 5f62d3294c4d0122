use netcfg_diff_core::{CmdId, Configuration, Grammar};
use serde::Serialize;

/// Parsed commands of one object, i.e. one prefix and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub prefix: String,
    pub name: String,
    pub lines: Vec<String>,
    pub references: Vec<String>,
}

/// Collect objects of `cfg`, optionally restricted to one prefix.
pub fn collect_objects(cfg: &Configuration, prefix: Option<&str>) -> Vec<ObjectEntry> {
    let mut out = Vec::new();
    for (p, names) in cfg.lookup() {
        if prefix.is_some_and(|want| want != p) {
            continue;
        }
        for (name, ids) in names {
            let mut lines = Vec::new();
            let mut references = Vec::new();
            for &id in ids {
                push_lines(cfg, id, &mut lines, &mut references);
            }
            references.sort();
            references.dedup();
            out.push(ObjectEntry {
                prefix: p.clone(),
                name: name.clone(),
                lines,
                references,
            });
        }
    }
    out
}

fn push_lines(cfg: &Configuration, id: CmdId, lines: &mut Vec<String>, refs: &mut Vec<String>) {
    let c = cfg.cmd(id);
    lines.push(cfg.printable(id));
    refs.extend(c.refs.iter().map(|r| format!("{} {}", r.prefix, r.name)));
    for &sub in &c.sub {
        lines.push(format!(" {}", cfg.printable(sub)));
        refs.extend(cfg.cmd(sub).refs.iter().map(|r| format!("{} {}", r.prefix, r.name)));
    }
}

/// Render objects grouped by prefix.
pub fn render_objects(entries: &[ObjectEntry]) -> String {
    let mut out = String::new();
    let mut last_prefix = None;
    for e in entries {
        if last_prefix != Some(&e.prefix) {
            out.push_str(&format!("== {}\n", e.prefix));
            last_prefix = Some(&e.prefix);
        }
        let name = if e.name.is_empty() { "-" } else { &e.name };
        out.push_str(&format!("[{name}]\n"));
        for line in &e.lines {
            out.push_str(&format!("  {line}\n"));
        }
        if !e.references.is_empty() {
            out.push_str(&format!("  -> {}\n", e.references.join(", ")));
        }
    }
    out
}

/// Render compiled descriptors, one template per line.
pub fn render_grammar(grammar: &Grammar) -> String {
    let mut out = String::new();
    for &id in grammar.top_level() {
        let t = grammar.get(id);
        let mut flags = Vec::new();
        if t.anchor {
            flags.push("ANCHOR");
        }
        if t.fixed_name {
            flags.push("FIXED_NAME");
        }
        if t.simple_obj {
            flags.push("SIMPLE_OBJ");
        }
        if t.clear_conf {
            flags.push("CLEAR_CONF");
        }
        let mark = if t.ignore { "!" } else { "" };
        out.push_str(&format!("{mark}{} {}", t.prefix, t.shape()).trim_end().to_string());
        if !flags.is_empty() {
            out.push_str(&format!(" [{}]", flags.join(", ")));
        }
        if !t.refs.is_empty() {
            out.push_str(&format!(" -> {}", t.refs.join(", ")));
        }
        out.push('\n');
        for &sub in &t.sub {
            let s = grammar.get(sub);
            let mark = if s.ignore { "!" } else { "" };
            out.push_str(&format!("  {mark}{}", s.shape()));
            if !s.refs.is_empty() {
                out.push_str(&format!(" -> {}", s.refs.join(", ")));
            }
            out.push('\n');
        }
    }
    out
}
