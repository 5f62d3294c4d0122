use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::grammar::{CommandType, Grammar, TypeId};

/// Index of a [`Command`] inside its [`Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CmdId(pub(crate) usize);

/// prefix -> name -> commands with same prefix and name
pub type Lookup = BTreeMap<String, BTreeMap<String, Vec<CmdId>>>;

/// Named reference from one command to another command group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub prefix: String,
    pub name: String,
}

impl Reference {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }
}

/// A parsed command or subcommand.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Descriptor this command was matched with.
    pub kind: TypeId,
    /// Text as found in input, e.g. `crypto map abc 10 match address xyz`.
    pub orig: String,
    /// Normalized shape, e.g. `crypto map $NAME $SEQ match address $REF`.
    pub parsed: String,
    /// Value of `$NAME`.
    pub name: String,
    /// Value of `$SEQ`.
    pub seq: usize,
    /// Values of `$REF`, each with its referenced prefix.
    pub refs: Vec<Reference>,
    /// Subcommands in input order.
    pub sub: Vec<CmdId>,
    /// Enclosing command of a subcommand.
    pub parent: Option<CmdId>,
    /// Compared directly, independent of its descriptor.
    pub anchor: bool,
    /// Name must be kept, independent of its descriptor.
    pub fixed_name: bool,
    /// Found after `[APPEND]` marker in raw file.
    pub append: bool,
}

/// Parsed configuration of one device or one generated file.
#[derive(Debug, Clone)]
pub struct Configuration {
    grammar: Arc<Grammar>,
    pub(crate) cmds: Vec<Command>,
    pub(crate) lookup: Lookup,
    is_raw: bool,
}

impl Configuration {
    /// Create an empty configuration for commands of `grammar`.
    pub fn new(grammar: Arc<Grammar>, is_raw: bool) -> Self {
        Self {
            grammar,
            cmds: Vec::new(),
            lookup: Lookup::new(),
            is_raw,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Configuration was read from a manually maintained raw file.
    pub fn is_raw(&self) -> bool {
        self.is_raw
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn cmd(&self, id: CmdId) -> &Command {
        &self.cmds[id.0]
    }

    pub(crate) fn cmd_mut(&mut self, id: CmdId) -> &mut Command {
        &mut self.cmds[id.0]
    }

    /// Descriptor of a command.
    pub fn kind(&self, id: CmdId) -> &CommandType {
        self.grammar.get(self.cmds[id.0].kind)
    }

    /// Number of commands in arena, including subcommands.
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.values().all(BTreeMap::is_empty)
    }

    pub(crate) fn push(&mut self, cmd: Command) -> CmdId {
        let id = CmdId(self.cmds.len());
        self.cmds.push(cmd);
        id
    }

    /// Commands with given prefix and name.
    pub fn get(&self, prefix: &str, name: &str) -> Option<&[CmdId]> {
        self.lookup
            .get(prefix)
            .and_then(|m| m.get(name))
            .map(Vec::as_slice)
    }

    /// Copy of commands with given prefix and name, empty if unknown.
    pub(crate) fn list(&self, prefix: &str, name: &str) -> Vec<CmdId> {
        self.get(prefix, name).map(<[CmdId]>::to_vec).unwrap_or_default()
    }

    pub(crate) fn contains(&self, prefix: &str, name: &str) -> bool {
        self.get(prefix, name).is_some()
    }

    pub(crate) fn set(&mut self, prefix: &str, name: &str, list: Vec<CmdId>) {
        self.lookup
            .entry(prefix.to_string())
            .or_default()
            .insert(name.to_string(), list);
    }

    /// Sorted names of command groups with given prefix.
    pub fn names(&self, prefix: &str) -> Vec<String> {
        self.lookup
            .get(prefix)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn is_fixed_name(&self, id: CmdId) -> bool {
        self.cmds[id.0].fixed_name || self.kind(id).fixed_name
    }


    /// Device command for `id` with name, sequence number and the current
    /// names of all referenced objects substituted.
    pub fn printable(&self, id: CmdId) -> String {
        let c = &self.cmds[id.0];
        let mut p = c.parsed.replacen("$NAME", &c.name, 1);
        p = p.replacen("$SEQ", &c.seq.to_string(), 1);
        for r in &c.refs {
            let name = self
                .get(&r.prefix, &r.name)
                .and_then(|l| l.first())
                .map(|&id| self.cmds[id.0].name.as_str())
                .unwrap_or(&r.name);
            p = p.replacen("$REF", name, 1);
        }
        p
    }

    /// Move all commands of `other` into the arena of `self`.
    ///
    /// Returns the lookup of `other` translated to ids of `self`; the
    /// lookup of `self` is left unchanged.
    pub(crate) fn absorb(&mut self, other: Configuration) -> Lookup {
        let offset = self.cmds.len();
        let shift = |id: CmdId| CmdId(id.0 + offset);
        for mut c in other.cmds {
            c.sub = c.sub.into_iter().map(shift).collect();
            c.parent = c.parent.map(shift);
            self.cmds.push(c);
        }
        other
            .lookup
            .into_iter()
            .map(|(prefix, m)| {
                let m = m
                    .into_iter()
                    .map(|(name, l)| (name, l.into_iter().map(shift).collect()))
                    .collect();
                (prefix, m)
            })
            .collect()
    }
}

/// Check two simple objects for equal content, ignoring their names.
///
/// Simple objects are known to have exactly one top-level command.
pub(crate) fn simple_obj_equal(
    ca: &Configuration,
    al: &[CmdId],
    cb: &Configuration,
    bl: &[CmdId],
) -> bool {
    let (Some(&a), Some(&b)) = (al.first(), bl.first()) else {
        return false;
    };
    fn sorted_sub(cf: &Configuration, id: CmdId) -> Vec<&str> {
        let mut l: Vec<&str> = cf
            .cmd(id)
            .sub
            .iter()
            .map(|&s| cf.cmd(s).parsed.as_str())
            .collect();
        l.sort_unstable();
        l
    }
    ca.cmd(a).parsed == cb.cmd(b).parsed && sorted_sub(ca, a) == sorted_sub(cb, b)
}

/// Search `ca` for a simple object with same content as `bl` from `cb`.
pub(crate) fn find_simple_object(
    ca: &Configuration,
    cb: &Configuration,
    bl: &[CmdId],
) -> Option<Vec<CmdId>> {
    let &b = bl.first()?;
    let prefix = &cb.kind(b).prefix;
    ca.lookup
        .get(prefix)?
        .values()
        .find(|al| simple_obj_equal(ca, al, cb, bl))
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::grammar::Grammar;
    use crate::parser::parse;

    #[test]
    fn printable_substitutes_current_reference_names() {
        let grammar = Arc::new(
            Grammar::compile(
                "object-group network $NAME\n *\n[ANCHOR]\nuse $object-group *\n",
            )
            .expect("grammar"),
        );
        let mut cfg = parse(
            &grammar,
            "object-group network g1\n network-object host 10.1.1.1\nuse g1 now\n",
            false,
        )
        .expect("parse");
        let id = cfg.get("use", "").expect("use")[0];
        assert_eq!(cfg.cmd(id).parsed, "use $REF now");
        assert_eq!(cfg.printable(id), "use g1 now");

        let group = cfg.get("object-group", "g1").expect("group")[0];
        cfg.cmd_mut(group).name = "g1-DRC-0".to_string();
        assert_eq!(cfg.printable(id), "use g1-DRC-0 now");
    }
}
