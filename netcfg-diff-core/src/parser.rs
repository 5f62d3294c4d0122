use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{CmdId, Command, Configuration, Reference};
use crate::grammar::{Grammar, Token, TypeId};
use crate::normalize;

/// Errors that can occur while parsing device configuration text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Raw files must only contain known commands.
    #[error("Unexpected command:\n>>{line}<<")]
    UnexpectedCommand { line: String },
    /// Subcommand is indented less than the first subcommand of its group.
    #[error("Bad indentation in subcommands, expected {indent} spaces:\n>>{line}<<")]
    BadIndentation { indent: usize, line: String },
    /// Quoted string without closing double quote.
    #[error("Incomplete string in: {line}")]
    UnterminatedString { line: String },
    /// Referenced object is neither defined nor a known default object.
    #[error("'{line}' references unknown '{prefix} {name}'")]
    UnknownReference {
        line: String,
        prefix: String,
        name: String,
    },
    /// Hosts of one LDAP aaa-server use different attribute maps.
    #[error("aaa-server {name} must not use different values in 'ldap-attribute-map'")]
    ConflictingAttributeMap { name: String },
}

/// Objects that exist implicitly on every device of a dialect.
const DEFAULT_OBJECTS: &[(&str, &str, &[&str])] = &[
    ("group-policy", "DfltGrpPolicy", &["internal"]),
    (
        "tunnel-group",
        "DefaultL2LGroup",
        &["type ipsec-l2l", "general-attributes"],
    ),
    (
        "tunnel-group",
        "DefaultRAGroup",
        &["type remote-access", "general-attributes"],
    ),
    (
        "tunnel-group",
        "DefaultWEBVPNGroup",
        &["type webvpn", "general-attributes"],
    ),
];

/// Check whether `prefix name` is an implicitly existing default object.
pub fn is_default_object(prefix: &str, name: &str) -> bool {
    default_object(prefix, name).is_some()
}

fn default_object(prefix: &str, name: &str) -> Option<&'static [&'static str]> {
    DEFAULT_OBJECTS
        .iter()
        .find(|(p, n, _)| *p == prefix && *n == name)
        .map(|(_, _, args)| *args)
}

/// Parse configuration bytes read from `file_name`.
///
/// A file with extension `.raw` is parsed as manually maintained raw file.
pub fn parse_config(
    grammar: &Arc<Grammar>,
    data: &[u8],
    file_name: &str,
) -> Result<Configuration, ParseError> {
    let is_raw = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == "raw");
    parse(grammar, &String::from_utf8_lossy(data), is_raw)
}

/// Parse configuration text into a [`Configuration`].
pub fn parse(
    grammar: &Arc<Grammar>,
    text: &str,
    is_raw: bool,
) -> Result<Configuration, ParseError> {
    let mut cfg = Configuration::new(Arc::clone(grammar), is_raw);
    // Previous toplevel command where subcommands are added.
    let mut prev: Option<CmdId> = None;
    // Uncommon indentation is only allowed at first subcommand.
    let mut is_first_sub = false;
    let mut indent = 1;
    let mut is_append = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        if line == "[APPEND]" {
            is_append = true;
            continue;
        }
        if !line.starts_with(' ') {
            is_first_sub = true;
            prev = None;
            let words: Vec<&str> = line.split(' ').collect();
            match lookup_cmd(grammar, &words)? {
                Some(mut c) => {
                    c.append = is_append;
                    let prefix = grammar.get(c.kind).prefix.clone();
                    let name = c.name.clone();
                    let id = cfg.push(c);
                    cfg.lookup
                        .entry(prefix)
                        .or_default()
                        .entry(name)
                        .or_default()
                        .push(id);
                    prev = Some(id);
                }
                None if is_raw => {
                    return Err(ParseError::UnexpectedCommand {
                        line: line.to_string(),
                    });
                }
                None => trace!(line, "skipping unknown command"),
            }
            continue;
        }
        let Some(parent) = prev else {
            continue;
        };
        let width = line.len() - line.trim_start_matches(' ').len();
        if is_first_sub {
            is_first_sub = false;
            indent = width;
        } else if width < indent {
            return Err(ParseError::BadIndentation {
                indent,
                line: line.to_string(),
            });
        }
        let rest = &line[indent..];
        // Sub-subcommands are ignored.
        if rest.starts_with(' ') {
            continue;
        }
        let words: Vec<&str> = rest.split_whitespace().collect();
        let kind = cfg.cmd(parent).kind;
        let candidates = &grammar.get(kind).sub;
        if let Some(mut c) = match_cmd(grammar, "", &words, candidates)? {
            c.append = is_append;
            c.parent = Some(parent);
            let id = cfg.push(c);
            cfg.cmd_mut(parent).sub.push(id);
        }
    }

    normalize::normalize(&mut cfg)?;
    check_references(&mut cfg)?;
    Ok(cfg)
}

/// Match a toplevel command by its prefix.
fn lookup_cmd(grammar: &Grammar, words: &[&str]) -> Result<Option<Command>, ParseError> {
    let Some(dispatch) = grammar.dispatch(words) else {
        return Ok(None);
    };
    let prefix = words[..dispatch.prefix_len].join(" ");
    match_cmd(
        grammar,
        &prefix,
        &words[dispatch.prefix_len..],
        dispatch.candidates,
    )
}

/// Try candidate descriptors in order and return the first matching command.
///
/// Returns `None` if no descriptor matches or if the matching descriptor
/// marks the command as ignored.
fn match_cmd(
    grammar: &Grammar,
    prefix: &str,
    words: &[&str],
    candidates: &[TypeId],
) -> Result<Option<Command>, ParseError> {
    'descr: for &kind in candidates {
        let descr = grammar.get(kind);
        let mut args = words;
        let mut parsed: Vec<String> = Vec::with_capacity(descr.template.len() + 1);
        let mut name = String::new();
        let mut seq = 0;
        let mut refs = Vec::new();

        for token in &descr.template {
            let Some(&w) = args.first() else {
                continue 'descr;
            };
            match token {
                Token::Name => {
                    name = w.to_string();
                    parsed.push(token.as_str().to_string());
                }
                Token::Seq => {
                    let Ok(num) = w.parse::<usize>() else {
                        continue 'descr;
                    };
                    seq = num;
                    parsed.push(token.as_str().to_string());
                }
                Token::Ref => {
                    let ref_prefix = &descr.refs[refs.len()];
                    refs.push(Reference::new(ref_prefix.as_str(), w));
                    parsed.push(token.as_str().to_string());
                }
                Token::Quoted => {
                    if w.starts_with('"') {
                        let end = args
                            .iter()
                            .position(|w2| w2.ends_with('"') && !w2.ends_with("\\\""))
                            .ok_or_else(|| ParseError::UnterminatedString {
                                line: words.join(" "),
                            })?;
                        parsed.push(args[..=end].join(" "));
                        args = &args[end..];
                    } else {
                        parsed.push(format!("\"{w}\""));
                    }
                }
                Token::Rest => {
                    parsed.push(args.join(" "));
                    args = &[];
                    break;
                }
                Token::Word(lit) => {
                    if lit != w {
                        continue 'descr;
                    }
                    parsed.push(w.to_string());
                }
            }
            args = &args[1..];
        }
        if !args.is_empty() {
            continue;
        }
        if descr.ignore {
            return Ok(None);
        }
        let mut orig = words.join(" ");
        let mut parsed = parsed.join(" ");
        if !prefix.is_empty() {
            orig = join_prefix(prefix, &orig);
            parsed = join_prefix(prefix, &parsed);
        }
        return Ok(Some(Command {
            kind,
            orig,
            parsed,
            name,
            seq,
            refs,
            sub: Vec::new(),
            parent: None,
            anchor: false,
            fixed_name: false,
            append: false,
        }));
    }
    Ok(None)
}

fn join_prefix(prefix: &str, rest: &str) -> String {
    if rest.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix} {rest}")
    }
}

/// Check that every reference resolves, completing default objects.
fn check_references(cfg: &mut Configuration) -> Result<(), ParseError> {
    let mut ids = Vec::new();
    for m in cfg.lookup.values() {
        for list in m.values() {
            for &id in list {
                ids.push(id);
                ids.extend_from_slice(&cfg.cmd(id).sub);
            }
        }
    }
    for id in ids {
        let refs = cfg.cmd(id).refs.clone();
        for r in refs {
            if cfg.contains(&r.prefix, &r.name) {
                continue;
            }
            match default_object(&r.prefix, &r.name) {
                Some(args) => add_default_object(cfg, &r.prefix, &r.name, args),
                None => {
                    return Err(ParseError::UnknownReference {
                        line: cfg.cmd(id).orig.clone(),
                        prefix: r.prefix,
                        name: r.name,
                    })
                }
            }
        }
    }
    Ok(())
}

fn add_default_object(cfg: &mut Configuration, prefix: &str, name: &str, args: &[&str]) {
    let grammar = Arc::clone(cfg.grammar());
    let mut list = cfg.list(prefix, name);
    let mut pos = 0;
    for arg in args {
        let line = format!("{prefix} {name} {arg}");
        let words: Vec<&str> = line.split(' ').collect();
        let Ok(Some(mut c)) = lookup_cmd(&grammar, &words) else {
            debug!(line, "default object not known by grammar");
            continue;
        };
        // Only add if not already parsed previously.
        if let Some(&existing) = list.iter().find(|&&id| cfg.cmd(id).parsed == c.parsed) {
            let e = cfg.cmd_mut(existing);
            e.fixed_name = true;
            e.anchor = true;
            continue;
        }
        c.fixed_name = true;
        c.anchor = true;
        let id = cfg.push(c);
        list.insert(pos, id);
        pos += 1;
    }
    cfg.set(prefix, name, list);
}

/// Add definitions of default group-policy and default tunnel-groups.
///
/// Default objects of prefixes unknown to the grammar are skipped.
pub fn add_defaults(cfg: &mut Configuration) {
    let grammar = Arc::clone(cfg.grammar());
    for (prefix, name, args) in DEFAULT_OBJECTS {
        if grammar.has_prefix(prefix) {
            add_default_object(cfg, prefix, name, args);
        }
    }
}
