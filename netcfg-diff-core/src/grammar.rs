use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// Errors detected while compiling grammar text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// The first template of the grammar (or of a section) is indented.
    #[error("line {line}: first template must not be indented")]
    IndentedFirstLine { line: usize },
    /// Subcommands may only be nested one level deep.
    #[error("line {line}: only indentation with one space is supported")]
    NestedIndentation { line: usize },
    /// A line consisting of `!` without template.
    #[error("line {line}: '!' must be followed by a template")]
    EmptyIgnore { line: usize },
    /// `*` used before the end of a template.
    #[error("line {line}: '*' must only be used at end of template")]
    MisplacedRest { line: usize },
    /// A top-level template without any token after its prefix is fine,
    /// but a template line with no prefix at all is not.
    #[error("line {line}: missing command prefix")]
    MissingPrefix { line: usize },
    /// Section header is not terminated or names an unknown flag.
    #[error("line {line}: invalid token {token:?} in section header")]
    InvalidHeader { line: usize, token: String },
    /// One prefix is a word-wise prefix of another one.
    #[error("inconsistent prefix {prefix:?}: prefix of another command prefix")]
    AmbiguousPrefix { prefix: String },
}

/// Index of a [`CommandType`] inside its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub(crate) usize);

/// One element of a command template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    /// Literal word that must match exactly.
    Word(String),
    /// `$NAME`, the name of the command.
    Name,
    /// `$SEQ`, a decimal sequence number.
    Seq,
    /// `$<prefix>`, a reference to a command with another prefix.
    Ref,
    /// `"`, a quoted string or a single word.
    Quoted,
    /// `*`, all remaining words.
    Rest,
}

impl Token {
    /// Symbolic form as it appears in the normalized shape of a command.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(w) => w,
            Token::Name => "$NAME",
            Token::Seq => "$SEQ",
            Token::Ref => "$REF",
            Token::Quoted => "\"",
            Token::Rest => "*",
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled grammar rule describing one kind of command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandType {
    /// Identifying prefix, e.g. `crypto map`. Empty for subcommands.
    pub prefix: String,
    /// Template following the prefix.
    pub template: Vec<Token>,
    /// Referenced prefixes, one for each [`Token::Ref`] in `template`.
    pub refs: Vec<String>,
    /// Matching commands are dropped.
    pub ignore: bool,
    /// Compared directly by name, not only when referenced.
    pub anchor: bool,
    /// Name on device must be kept.
    pub fixed_name: bool,
    /// Identity is irrelevant, object is found by content.
    pub simple_obj: bool,
    /// Whole group can be removed with `clear configure PREFIX NAME`.
    pub clear_conf: bool,
    /// Descriptors of subcommands.
    pub sub: Vec<TypeId>,
}

impl CommandType {
    fn new(prefix: String, template: Vec<Token>, refs: Vec<String>, ignore: bool) -> Self {
        Self {
            prefix,
            template,
            refs,
            ignore,
            anchor: false,
            fixed_name: false,
            simple_obj: false,
            clear_conf: false,
            sub: Vec::new(),
        }
    }

    /// Template in its textual form, e.g. `$NAME $SEQ match address $REF`.
    pub fn shape(&self) -> String {
        let words: Vec<&str> = self.template.iter().map(Token::as_str).collect();
        words.join(" ")
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    next: HashMap<String, TrieNode>,
    types: Vec<TypeId>,
}

/// Result of a successful prefix lookup.
#[derive(Debug, Clone, Copy)]
pub struct Dispatch<'a> {
    /// Number of words forming the prefix.
    pub prefix_len: usize,
    /// Candidate descriptors, tried in grammar order.
    pub candidates: &'a [TypeId],
}

/// Set of command descriptors for one device dialect.
#[derive(Debug)]
pub struct Grammar {
    types: Vec<CommandType>,
    top: Vec<TypeId>,
    trie: TrieNode,
}

#[derive(Debug, Default, Clone, Copy)]
struct SectionFlags {
    anchor: bool,
    fixed_name: bool,
    simple_obj: bool,
    clear_conf: bool,
}

impl Grammar {
    /// Compile grammar text into descriptors and a prefix trie.
    ///
    /// One template per line. The first word of a top-level template is its
    /// prefix, with `_` standing for a space. A single leading space marks a
    /// subcommand of the previous top-level template, a leading `!` marks
    /// commands to be ignored and `#` starts a comment. `[FLAG, ...]` applies
    /// `ANCHOR`, `FIXED_NAME`, `SIMPLE_OBJ` or `CLEAR_CONF` to the following
    /// templates up to the next blank line.
    pub fn compile(text: &str) -> Result<Self, GrammarError> {
        let mut grammar = Grammar {
            types: Vec::new(),
            top: Vec::new(),
            trie: TrieNode::default(),
        };
        let mut section = SectionFlags::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_nr = idx + 1;
            let mut line = raw.trim_end_matches([' ', '\t', '\r']);
            if line.is_empty() {
                section = SectionFlags::default();
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                section = parse_header(line, line_nr)?;
                continue;
            }

            let mut parent = None;
            if let Some(rest) = line.strip_prefix(' ') {
                if rest.starts_with(' ') {
                    return Err(GrammarError::NestedIndentation { line: line_nr });
                }
                if rest.starts_with('#') {
                    continue;
                }
                let prev = grammar
                    .top
                    .last()
                    .copied()
                    .ok_or(GrammarError::IndentedFirstLine { line: line_nr })?;
                parent = Some(prev);
                line = rest;
            }

            let mut ignore = false;
            if let Some(rest) = line.strip_prefix('!') {
                if rest.trim().is_empty() {
                    return Err(GrammarError::EmptyIgnore { line: line_nr });
                }
                ignore = true;
                line = rest;
            }

            let mut words = line.split_whitespace();
            let prefix = if parent.is_none() {
                words
                    .next()
                    .ok_or(GrammarError::MissingPrefix { line: line_nr })?
                    .replace('_', " ")
            } else {
                String::new()
            };
            let words: Vec<&str> = words.collect();
            let (template, refs) = compile_template(&words, line_nr)?;

            let mut descr = CommandType::new(prefix, template, refs, ignore);
            descr.anchor = section.anchor;
            descr.fixed_name = section.fixed_name;
            descr.simple_obj = section.simple_obj;
            descr.clear_conf = section.clear_conf;

            let id = TypeId(grammar.types.len());
            grammar.types.push(descr);
            match parent {
                Some(p) => grammar.types[p.0].sub.push(id),
                None => grammar.top.push(id),
            }
        }

        grammar.build_trie()?;
        Ok(grammar)
    }

    fn build_trie(&mut self) -> Result<(), GrammarError> {
        for &id in &self.top {
            let prefix = &self.types[id.0].prefix;
            let mut node = &mut self.trie;
            let words: Vec<&str> = prefix.split(' ').collect();
            for (i, word) in words.iter().enumerate() {
                node = node.next.entry((*word).to_string()).or_default();
                let last = i + 1 == words.len();
                if last && !node.next.is_empty() || !last && !node.types.is_empty() {
                    return Err(GrammarError::AmbiguousPrefix {
                        prefix: prefix.clone(),
                    });
                }
            }
            node.types.push(id);
        }
        Ok(())
    }

    /// Descriptor with the given id.
    pub fn get(&self, id: TypeId) -> &CommandType {
        &self.types[id.0]
    }

    /// Top-level descriptors in grammar order.
    pub fn top_level(&self) -> &[TypeId] {
        &self.top
    }

    /// Find descriptors for a top-level command by longest word-wise prefix.
    pub fn dispatch(&self, words: &[&str]) -> Option<Dispatch<'_>> {
        let mut node = &self.trie;
        for (i, word) in words.iter().enumerate() {
            node = node.next.get(*word)?;
            if !node.types.is_empty() {
                return Some(Dispatch {
                    prefix_len: i + 1,
                    candidates: &node.types,
                });
            }
        }
        None
    }

    /// Check whether some top-level descriptor uses `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let words: Vec<&str> = prefix.split(' ').collect();
        self.dispatch(&words)
            .is_some_and(|d| d.prefix_len == words.len())
    }
}

fn compile_template(
    words: &[&str],
    line_nr: usize,
) -> Result<(Vec<Token>, Vec<String>), GrammarError> {
    let mut template = Vec::with_capacity(words.len());
    let mut refs = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let token = match *word {
            "*" => {
                if i + 1 != words.len() {
                    return Err(GrammarError::MisplacedRest { line: line_nr });
                }
                Token::Rest
            }
            "\"" => Token::Quoted,
            "$NAME" => Token::Name,
            "$SEQ" => Token::Seq,
            w if w.len() > 1 && w.starts_with('$') => {
                refs.push(w[1..].replace('_', " "));
                Token::Ref
            }
            w => Token::Word(w.to_string()),
        };
        template.push(token);
    }
    Ok((template, refs))
}

fn parse_header(line: &str, line_nr: usize) -> Result<SectionFlags, GrammarError> {
    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(|| GrammarError::InvalidHeader {
            line: line_nr,
            token: line.to_string(),
        })?;
    let mut flags = SectionFlags::default();
    for token in inner.split(',') {
        match token.trim() {
            "ANCHOR" => flags.anchor = true,
            "FIXED_NAME" => flags.fixed_name = true,
            "SIMPLE_OBJ" => flags.simple_obj = true,
            "CLEAR_CONF" => flags.clear_conf = true,
            other => {
                return Err(GrammarError::InvalidHeader {
                    line: line_nr,
                    token: other.to_string(),
                })
            }
        }
    }
    Ok(flags)
}
