//! Merge of a partial configuration into a target configuration.
//!
//! Used to combine the generated IPv4 and IPv6 files and to add commands
//! of a manually maintained raw file.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{find_simple_object, CmdId, Configuration, Lookup};
use crate::crypto::{self, MissingPeer};
use crate::parser::is_default_object;

/// Errors that can occur while merging configurations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Commands with this prefix can't be merged from raw file.
    #[error("Command '{prefix}' not supported in raw file")]
    Unsupported { prefix: String },
    /// Raw file defines an object whose name already exists.
    #[error("Name clash for '{name}' of '{prefix}' from raw file")]
    NameClash { prefix: String, name: String },
    /// Object of raw file is referenced more than once.
    #[error("Must reference '{prefix} {name}' only once in raw file")]
    MultipleReference { prefix: String, name: String },
    #[error(transparent)]
    MissingPeer(#[from] MissingPeer),
}

/// Merge `other` into `target`.
///
/// Anchors of `other` are combined with anchors of `target` and referenced
/// objects are transferred. Objects of a raw file that are not referenced
/// by any anchor are dropped; a warning is returned for each of them.
pub fn merge_into(
    target: &mut Configuration,
    other: Configuration,
) -> Result<Vec<String>, MergeError> {
    let b_is_raw = other.is_raw();
    let b_lookup = target.absorb(other);
    let mut session = MergeSession {
        cfg: target,
        b_lookup,
        b_is_raw,
        is_referenced: HashMap::new(),
        merged: HashSet::new(),
    };
    session.run()
}

struct MergeSession<'a> {
    cfg: &'a mut Configuration,
    b_lookup: Lookup,
    b_is_raw: bool,
    is_referenced: HashMap<CmdId, bool>,
    // First command of each group of other that was already merged.
    merged: HashSet<CmdId>,
}

impl MergeSession<'_> {
    fn run(&mut self) -> Result<Vec<String>, MergeError> {
        let groups: Vec<(String, String, Vec<CmdId>)> = self
            .b_lookup
            .iter()
            .flat_map(|(prefix, m)| {
                m.iter()
                    .map(move |(name, l)| (prefix.clone(), name.clone(), l.clone()))
            })
            .collect();

        for (prefix, name, bl) in groups {
            let Some(&b0) = bl.first() else {
                continue;
            };
            if self.b_is_raw && matches!(prefix.as_str(), "tunnel-group-map" | "webvpn") {
                return Err(MergeError::Unsupported { prefix });
            }
            if self.cfg.kind(b0).anchor
                || self.cfg.cmd(b0).anchor
                || is_default_object(&prefix, &name)
            {
                let al = self.cfg.list(&prefix, &name);
                self.merge_cmds(al, bl, &name, &prefix)?;
            } else if self.b_is_raw {
                self.is_referenced.entry(b0).or_insert(false);
            }
        }

        let mut warnings: Vec<String> = self
            .is_referenced
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(&id, _)| {
                let c = self.cfg.cmd(id);
                format!(
                    "Ignoring unused '{} {}' in raw",
                    self.cfg.kind(id).prefix,
                    c.name
                )
            })
            .collect();
        warnings.sort();
        for w in &warnings {
            warn!("{w}");
        }
        Ok(warnings)
    }

    fn merge_cmds(
        &mut self,
        al: Vec<CmdId>,
        bl: Vec<CmdId>,
        name: &str,
        prefix: &str,
    ) -> Result<(), MergeError> {
        let Some(&b0) = bl.first() else {
            return Ok(());
        };
        if !self.merged.insert(b0) {
            return Ok(());
        }
        debug!(prefix, name, "merging");
        match prefix {
            "crypto map" => return self.merge_crypto_map(al, bl, name, prefix),
            "crypto dynamic-map" => {
                let add = self.merge_crypto_common(&al, &bl)?;
                let mut al = al;
                al.extend(add);
                self.cfg.set(prefix, name, al);
                return Ok(());
            }
            "access-list" => return self.merge_asa_acls(al, bl, name, prefix),
            "ip access-list extended" => {
                self.merge_ios_acls(&al, &bl, name, prefix);
                return Ok(());
            }
            _ => {}
        }

        let mut al = al;
        let by_parsed: HashMap<String, CmdId> = al
            .iter()
            .map(|&id| (self.cfg.cmd(id).parsed.clone(), id))
            .collect();
        for b in bl {
            if let Some(&a) = by_parsed.get(&self.cfg.cmd(b).parsed) {
                self.merge_sub_cmds(a, b)?;
                self.merge_refs(Some(a), b)?;
            } else {
                for bs in self.cfg.cmd(b).sub.clone() {
                    self.merge_refs(None, bs)?;
                }
                self.merge_refs(None, b)?;
                al.push(b);
            }
        }
        self.cfg.set(prefix, name, al);
        Ok(())
    }

    fn merge_sub_cmds(&mut self, a: CmdId, b: CmdId) -> Result<(), MergeError> {
        let by_parsed: HashMap<String, CmdId> = self
            .cfg
            .cmd(a)
            .sub
            .iter()
            .map(|&id| (self.cfg.cmd(id).parsed.clone(), id))
            .collect();
        for bs in self.cfg.cmd(b).sub.clone() {
            let found = by_parsed.get(&self.cfg.cmd(bs).parsed).copied();
            self.merge_refs(found, bs)?;
            if found.is_none() {
                self.cfg.cmd_mut(a).sub.push(bs);
                self.cfg.cmd_mut(bs).parent = Some(a);
            }
        }
        Ok(())
    }

    /// Transfer objects referenced by `b`.
    ///
    /// If `a` is given, `b` is equal to `a` and referenced objects are
    /// merged into the objects referenced by `a`.
    fn merge_refs(&mut self, a: Option<CmdId>, b: CmdId) -> Result<(), MergeError> {
        let refs = self.cfg.cmd(b).refs.clone();
        for (i, r) in refs.iter().enumerate() {
            let prefix = r.prefix.as_str();
            let Some(bl) = self.b_lookup.get(prefix).and_then(|m| m.get(&r.name)).cloned()
            else {
                continue;
            };
            let Some(&ref_cmd) = bl.first() else {
                continue;
            };

            if self.cfg.kind(ref_cmd).simple_obj {
                self.is_referenced.insert(ref_cmd, true);
                let al = match find_simple_object(self.cfg, self.cfg, &bl) {
                    Some(al) => al,
                    None => {
                        if self.b_is_raw && self.cfg.contains(prefix, &r.name) {
                            return Err(MergeError::NameClash {
                                prefix: prefix.to_string(),
                                name: r.name.clone(),
                            });
                        }
                        self.cfg.set(prefix, &r.name, bl.clone());
                        bl
                    }
                };
                let obj_name = self.cfg.cmd(al[0]).name.clone();
                let holder = a.unwrap_or(b);
                self.cfg.cmd_mut(holder).refs[i].name = obj_name;
                continue;
            }

            let mut store_name = r.name.clone();
            let mut al = Vec::new();
            if let Some(a) = a {
                if self.is_referenced.get(&ref_cmd).copied().unwrap_or(false) {
                    return Err(MergeError::MultipleReference {
                        prefix: prefix.to_string(),
                        name: r.name.clone(),
                    });
                }
                store_name = self.cfg.cmd(a).refs[i].name.clone();
                al = self.cfg.list(prefix, &store_name);
                for &c in &bl {
                    self.cfg.cmd_mut(c).name = store_name.clone();
                }
            } else if self.b_is_raw && self.cfg.contains(prefix, &r.name) {
                return Err(MergeError::NameClash {
                    prefix: prefix.to_string(),
                    name: r.name.clone(),
                });
            }
            self.is_referenced.insert(ref_cmd, true);
            self.merge_cmds(al, bl, &store_name, prefix)?;
        }
        Ok(())
    }

    fn merge_crypto_map(
        &mut self,
        al: Vec<CmdId>,
        bl: Vec<CmdId>,
        name: &str,
        prefix: &str,
    ) -> Result<(), MergeError> {
        let pairs = crypto::match_crypto_map(self.cfg, &al, self.cfg, &bl)?;
        let map_name = al.first().map(|&id| self.cfg.cmd(id).name.clone());
        let mut al = al;
        for pair in pairs {
            crypto::renumber(self.cfg, &pair, map_name.as_deref());
            let add = self.merge_crypto_common(&pair.a, &pair.b)?;
            al.extend(add);
        }
        self.cfg.set(prefix, name, al);
        Ok(())
    }

    /// Merge entries of one crypto map sequence number.
    ///
    /// Entries are identified by the two words following `$NAME $SEQ`.
    /// Returns entries of `bl` to be added.
    fn merge_crypto_common(
        &mut self,
        al: &[CmdId],
        bl: &[CmdId],
    ) -> Result<Vec<CmdId>, MergeError> {
        fn key(parsed: &str) -> String {
            parsed
                .split(' ')
                .skip(4)
                .take(2)
                .collect::<Vec<_>>()
                .join(" ")
        }
        let by_key: HashMap<String, CmdId> = al
            .iter()
            .map(|&id| (key(&self.cfg.cmd(id).parsed), id))
            .collect();
        let first_seq = al.first().map(|&id| self.cfg.cmd(id).seq);
        let mut add = Vec::new();
        for &b in bl {
            match by_key.get(&key(&self.cfg.cmd(b).parsed)) {
                Some(&a) if self.cfg.cmd(a).parsed == self.cfg.cmd(b).parsed => {
                    self.merge_refs(Some(a), b)?;
                }
                Some(&a) => {
                    self.merge_refs(None, b)?;
                    let (parsed, refs) = {
                        let c = self.cfg.cmd(b);
                        (c.parsed.clone(), c.refs.clone())
                    };
                    let c = self.cfg.cmd_mut(a);
                    c.parsed = parsed;
                    c.refs = refs;
                }
                None => {
                    if let Some(seq) = first_seq {
                        self.cfg.cmd_mut(b).seq = seq;
                    }
                    add.push(b);
                    self.merge_refs(None, b)?;
                }
            }
        }
        Ok(add)
    }

    fn merge_asa_acls(
        &mut self,
        al: Vec<CmdId>,
        bl: Vec<CmdId>,
        name: &str,
        prefix: &str,
    ) -> Result<(), MergeError> {
        let mut acl = al;
        let mut prepend = Vec::new();
        let mut append = Vec::new();
        for &b in &bl {
            if self.cfg.cmd(b).append {
                append.push(b);
            } else {
                prepend.push(b);
            }
            self.merge_refs(None, b)?;
        }
        if !prepend.is_empty() {
            // Final deny line of IPv6 part goes to end of merged list.
            let deny6 = match prepend.last() {
                Some(&last)
                    if self.cfg.cmd(last).parsed
                        == "access-list $NAME extended deny ip any6 any6" =>
                {
                    prepend.pop()
                }
                _ => None,
            };
            prepend.extend(acl);
            prepend.extend(deny6);
            acl = prepend;
        }
        if !append.is_empty() {
            let pos = acl
                .iter()
                .rposition(|&id| self.cfg.cmd(id).parsed.contains("$NAME extended permit"))
                .map_or(0, |i| i + 1);
            acl.splice(pos..pos, append);
        }
        self.cfg.set(prefix, name, acl);
        Ok(())
    }

    fn merge_ios_acls(&mut self, al: &[CmdId], bl: &[CmdId], name: &str, prefix: &str) {
        let Some(&b0) = bl.first() else {
            return;
        };
        let mut acl = al
            .first()
            .map(|&a0| self.cfg.cmd(a0).sub.clone())
            .unwrap_or_default();
        let mut prepend = Vec::new();
        let mut append = Vec::new();
        for &b in bl {
            for &sb in &self.cfg.cmd(b).sub {
                if self.cfg.cmd(sb).append {
                    append.push(sb);
                } else {
                    prepend.push(sb);
                }
            }
        }
        if !prepend.is_empty() {
            prepend.extend(acl);
            acl = prepend;
        }
        if !append.is_empty() {
            let pos = acl
                .iter()
                .rposition(|&id| self.cfg.cmd(id).parsed.starts_with("permit "))
                .map_or(0, |i| i + 1);
            acl.splice(pos..pos, append);
        }
        for &id in &acl {
            self.cfg.cmd_mut(id).parent = Some(b0);
        }
        self.cfg.cmd_mut(b0).sub = acl;
        self.cfg.set(prefix, name, vec![b0]);
    }
}
