use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{find_simple_object, simple_obj_equal, CmdId, Configuration};
use crate::crypto::{self, MissingPeer};
use crate::dialect::Model;
use crate::diff::edit::{self, Edit, Op};
use crate::diff::result::{Reconciliation, Tuning};
use crate::diff::state::Flags;
use crate::parser::add_defaults;

/// Errors that abort a reconciliation. No partial result is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error(transparent)]
    MissingPeer(#[from] MissingPeer),
    #[error("Can't insert more than {limit} ACL lines at once")]
    KeyspaceExceeded { limit: usize },
    #[error("'{prefix} {name}' must be transferred manually")]
    ManualTransfer { prefix: String, name: String },
    #[error("Interface '{name}' from target not known on device")]
    UnknownInterface { name: String },
    #[error("Different {attribute} defined for interface {name}: Device: {device}, target: {target}")]
    InterfaceMismatch {
        name: String,
        attribute: String,
        device: String,
        target: String,
    },
    #[error("Can't delete objects referencing each other: {}", .objects.join(", "))]
    ReferenceCycle { objects: Vec<String> },
}

/// Compute commands that change `current` into `target`.
pub fn reconcile(
    current: Configuration,
    target: Configuration,
    model: Model,
) -> Result<Reconciliation, DiffError> {
    reconcile_with(current, target, model, &Tuning::default())
}

/// Like [`reconcile`] with explicit heuristic thresholds.
pub fn reconcile_with(
    mut current: Configuration,
    mut target: Configuration,
    model: Model,
    tuning: &Tuning,
) -> Result<Reconciliation, DiffError> {
    add_defaults(&mut current);
    add_defaults(&mut target);
    let mut session = Session::new(current, target, model, tuning.clone());
    session.run()?;
    debug!(changes = session.result.changes.len(), "reconciled");
    Ok(session.result)
}

/// Key used to pair commands of device and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Key {
    Parsed,
    Orig,
    /// `subject-name` of referenced certificate map.
    CertMap,
}

impl Key {
    pub(crate) fn of(self, cf: &Configuration, id: CmdId) -> String {
        let c = cf.cmd(id);
        match self {
            Key::Parsed => c.parsed.clone(),
            Key::Orig => c.orig.clone(),
            Key::CertMap => {
                // tunnel-group-map default-group $tunnel-group
                if c.refs.len() == 1 {
                    return "default-group".to_string();
                }
                let Some(r) = c.refs.first() else {
                    return String::new();
                };
                cf.get(&r.prefix, &r.name)
                    .and_then(|l| l.first())
                    .and_then(|&map| {
                        cf.cmd(map)
                            .sub
                            .iter()
                            .map(|&s| &cf.cmd(s).parsed)
                            .find(|p| p.starts_with("subject-name attr"))
                    })
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }

    pub(crate) fn list(self, cf: &Configuration, l: &[CmdId]) -> Vec<String> {
        l.iter().map(|&id| self.of(cf, id)).collect()
    }
}

/// State of one reconciliation run.
///
/// `a` is the configuration found on device, `b` the target.
pub(crate) struct Session {
    pub a: Configuration,
    pub b: Configuration,
    pub flags: Flags,
    pub model: Model,
    pub tuning: Tuning,
    pub result: Reconciliation,
    /// Printed parent command whose configuration mode is active.
    pub sub_cmd_of: String,
}

impl Session {
    fn new(a: Configuration, b: Configuration, model: Model, tuning: Tuning) -> Self {
        let flags = Flags::new(a.len(), b.len());
        Self {
            a,
            b,
            flags,
            model,
            tuning,
            result: Reconciliation::default(),
            sub_cmd_of: String::new(),
        }
    }

    pub(crate) fn add_change(&mut self, chg: String) {
        self.result.changes.push(chg);
    }

    pub(crate) fn warning(&mut self, msg: String) {
        warn!("{msg}");
        self.result.warnings.push(msg);
    }

    pub(crate) fn note(&mut self, msg: String) {
        info!("{msg}");
        self.result.notes.push(msg);
    }

    fn run(&mut self) -> Result<(), DiffError> {
        self.align_vrfs();
        self.check_interfaces()?;
        self.ignore_crypto_gdoi();
        super::acl::sort_groups(&mut self.a);
        super::acl::sort_groups(&mut self.b);
        super::route::sort_routes(&mut self.a);
        super::route::sort_routes(&mut self.b);
        self.generate_names();

        let prefixes: BTreeSet<String> = self
            .a
            .lookup
            .keys()
            .chain(self.b.lookup.keys())
            .cloned()
            .collect();
        for prefix in prefixes {
            debug!(prefix = prefix.as_str(), "comparing");
            match prefix.as_str() {
                "tunnel-group-map" => {
                    let al = self.a.list(&prefix, "");
                    let bl = self.b.list(&prefix, "");
                    self.diff_cmds(al, bl, Key::CertMap)?;
                }
                "webvpn" => self.diff_webvpn()?,
                _ => {
                    let only_anchors = !self.is_anchor_prefix(&prefix);
                    self.diff_named(&prefix, only_anchors)?;
                }
            }
        }
        self.delete_unused()
    }

    /// Descriptor of commands with `prefix` is marked as anchor.
    fn is_anchor_prefix(&self, prefix: &str) -> bool {
        let first = |cf: &Configuration| {
            cf.lookup.get(prefix).map(|m| {
                m.values()
                    .next()
                    .and_then(|l| l.first())
                    .is_some_and(|&id| cf.kind(id).anchor)
            })
        };
        first(&self.b).or_else(|| first(&self.a)).unwrap_or(false)
    }

    /// Compare command groups with equal name.
    ///
    /// With `only_anchors`, only groups whose first command is marked as
    /// anchor are compared directly.
    fn diff_named(&mut self, prefix: &str, only_anchors: bool) -> Result<(), DiffError> {
        let names = |cf: &Configuration| -> Vec<String> {
            cf.lookup
                .get(prefix)
                .map(|m| {
                    m.iter()
                        .filter(|(_, l)| {
                            !only_anchors || l.first().is_some_and(|&id| cf.cmd(id).anchor)
                        })
                        .map(|(name, _)| name.clone())
                        .collect()
                })
                .unwrap_or_default()
        };
        let a_names = names(&self.a);
        let b_names = names(&self.b);
        for name in &a_names {
            let al = self.a.list(prefix, name);
            let bl = self.b.list(prefix, name);
            self.diff_cmds(al, bl, Key::Parsed)?;
        }
        for name in &b_names {
            if !self.a.contains(prefix, name) {
                let bl = self.b.list(prefix, name);
                self.diff_cmds(Vec::new(), bl, Key::Parsed)?;
            }
        }
        Ok(())
    }

    fn diff_webvpn(&mut self) -> Result<(), DiffError> {
        let al = self.a.list("webvpn", "");
        let bl = self.b.list("webvpn", "");
        match (al.first(), bl.first()) {
            (None, None) => {}
            (None, Some(_)) => self.add_cmds(&bl)?,
            (Some(&a0), Some(&b0)) => {
                for &a in &al {
                    self.flags.set_needed(a);
                }
                let a_sub = self.a.cmd(a0).sub.clone();
                let b_sub = self.b.cmd(b0).sub.clone();
                self.diff_cmds(a_sub, b_sub, Key::CertMap)?;
            }
            (Some(&a0), None) => {
                let a_sub = self.a.cmd(a0).sub.clone();
                self.del_cmds(&a_sub);
            }
        }
        Ok(())
    }

    fn diff_cmd_lists(&mut self, al: &mut [CmdId], bl: &mut [CmdId], key: Key) -> Vec<Edit> {
        if let Some(&a0) = al.first() {
            if self.a.kind(a0).prefix == "access-list" {
                return edit::myers(&key.list(&self.a, al), &key.list(&self.b, bl));
            }
            if is_ios_acl_line(&self.a, a0) {
                super::acl::sort_ios_blocks(&mut self.a, al);
                super::acl::sort_ios_blocks(&mut self.b, bl);
                return edit::myers(&key.list(&self.a, al), &key.list(&self.b, bl));
            }
        }
        edit::unordered(&key.list(&self.a, al), &key.list(&self.b, bl))
    }

    /// Compare lists of commands, either top-level commands with equal
    /// prefix and name or subcommands of otherwise equal commands.
    ///
    /// Returns name of the existing command if it is kept or changed, or
    /// the name of the new command that replaces it.
    pub(crate) fn diff_cmds(
        &mut self,
        mut al: Vec<CmdId>,
        mut bl: Vec<CmdId>,
        key: Key,
    ) -> Result<String, DiffError> {
        // Command on device was already equalized with other target command.
        if al.first().is_some_and(|&a0| self.flags.needed(a0)) {
            let Some(&b0) = bl.first() else {
                return Ok(String::new());
            };
            self.add_cmds(&bl)?;
            return Ok(self.b.cmd(b0).name.clone());
        }
        if let Some(&b0) = bl.first() {
            // Already transferred or found on device.
            if self.flags.ready(b0) {
                return Ok(self.b.cmd(b0).name.clone());
            }
            if self.b.kind(b0).simple_obj {
                return self.equalize_simple_object(al, bl);
            }
        }

        let diff = self.diff_cmd_lists(&mut al, &mut bl, key);
        let mut has_eq = diff.iter().any(Edit::is_equal);
        let is_eq = diff.iter().all(Edit::is_equal);
        if let Some(&a0) = al.first() {
            if matches!(
                self.a.kind(a0).prefix.as_str(),
                "route" | "ip route" | "ipv6 route"
            ) {
                self.diff_routes(&al, &bl, &diff);
                return Ok(String::new());
            }
        }
        // Standard ACL can't be changed incrementally.
        if !is_eq {
            for &id in &al {
                let p = &self.a.cmd(id).parsed;
                if p.starts_with("access-list $NAME extended ") {
                    break;
                }
                if p.starts_with("access-list $NAME standard ") {
                    has_eq = false;
                    break;
                }
            }
        }
        // Nothing equal: remove all from device and add all from target.
        if !has_eq {
            if let Some(&a0) = al.first() {
                // Top-level command may still be referenced from elsewhere.
                if self.a.cmd(a0).parent.is_none() {
                    self.mark_deleted(&al);
                } else {
                    self.del_cmds(&al);
                }
            }
            let Some(&b0) = bl.first() else {
                return Ok(String::new());
            };
            self.add_cmds(&bl)?;
            return Ok(self.b.cmd(b0).name.clone());
        }

        // has_eq implies both lists are non-empty.
        let a0 = al[0];
        let a_name = self.a.cmd(a0).name.clone();
        for e in diff.iter().filter(|e| e.is_insert()) {
            for &b in &bl[e.b.clone()] {
                self.b.cmd_mut(b).name = a_name.clone();
            }
        }
        if self.a.kind(a0).prefix == "access-list" {
            self.diff_asa_acls(&al, &bl, &diff)?;
            return Ok(a_name);
        }
        if is_ios_acl_line(&self.a, a0) {
            self.diff_ios_acls(al, bl, diff)?;
            return Ok(a_name);
        }
        for e in diff.iter().filter(|e| e.is_delete()) {
            self.del_cmds(&al[e.a.clone()]);
        }
        for e in &diff {
            match e.op {
                Op::Insert => self.add_cmds(&bl[e.b.clone()])?,
                Op::Equal => self.make_equal(&al[e.a.clone()], &bl[e.b.clone()])?,
                Op::Delete => {}
            }
        }
        Ok(a_name)
    }

    /// Equalize subcommands and referenced commands of pairwise equal
    /// commands whose names may differ.
    fn make_equal(&mut self, al: &[CmdId], bl: &[CmdId]) -> Result<(), DiffError> {
        for (&a, &b) in al.iter().zip(bl) {
            self.flags.set_needed(a);
            self.flags.set_ready(b);
            let (name, seq) = {
                let c = self.a.cmd(a);
                (c.name.clone(), c.seq)
            };
            {
                let c = self.b.cmd_mut(b);
                c.name = name;
                c.seq = seq;
            }
            let a_sub = self.a.cmd(a).sub.clone();
            let b_sub = self.b.cmd(b).sub.clone();
            self.diff_cmds(a_sub, b_sub, Key::Parsed)?;

            let a_refs = self.a.cmd(a).refs.clone();
            let b_refs = self.b.cmd(b).refs.clone();
            let mut changed_ref = false;
            for (ar, br) in a_refs.iter().zip(&b_refs) {
                let a_ref = self.a.list(&ar.prefix, &ar.name);
                let b_ref = self.b.list(&br.prefix, &br.name);
                let ref_name = if ar.prefix == "aaa-server" && ar.name != br.name {
                    self.add_cmds(&b_ref)?;
                    br.name.clone()
                } else if ar.prefix == "crypto map" {
                    self.diff_crypto_map(a_ref, b_ref)?
                } else {
                    self.diff_cmds(a_ref, b_ref, Key::Parsed)?
                };
                if ref_name != ar.name {
                    changed_ref = true;
                }
            }
            if changed_ref {
                if self.b.cmd(b).parsed.contains("$NAME $SEQ set ikev") {
                    let chg = format!("no {}", self.a.cmd(a).orig);
                    self.add_change(chg);
                }
                self.add_cmd(b);
            }
        }
        Ok(())
    }

    fn equalize_simple_object(
        &mut self,
        al: Vec<CmdId>,
        bl: Vec<CmdId>,
    ) -> Result<String, DiffError> {
        let mut found = Some(al);
        if !found
            .as_deref()
            .is_some_and(|al| simple_obj_equal(&self.a, al, &self.b, &bl))
        {
            if let Some(al) = &found {
                self.mark_deleted(al);
            }
            found = find_simple_object(&self.a, &self.b, &bl);
        }
        let b0 = bl[0];
        if let Some(&a0) = found.as_ref().and_then(|al| al.first()) {
            self.flags.set_needed(a0);
            self.flags.set_ready(b0);
            let name = self.a.cmd(a0).name.clone();
            self.b.cmd_mut(b0).name = name.clone();
            return Ok(name);
        }
        self.add_cmds(&bl)?;
        Ok(self.b.cmd(b0).name.clone())
    }

    pub(crate) fn diff_crypto_map(
        &mut self,
        al: Vec<CmdId>,
        bl: Vec<CmdId>,
    ) -> Result<String, DiffError> {
        let pairs = crypto::match_crypto_map(&self.a, &al, &self.b, &bl)?;
        let map_name = al.first().map(|&id| self.a.cmd(id).name.clone());
        for pair in pairs {
            crypto::renumber(&mut self.b, &pair, map_name.as_deref());
            self.diff_cmds(pair.a, pair.b, Key::Parsed)?;
        }
        Ok(map_name.unwrap_or_default())
    }

    /// Transfer target commands `l` together with everything they reference,
    /// referenced commands first. Each group is transferred only once.
    pub(crate) fn add_cmds(&mut self, l: &[CmdId]) -> Result<(), DiffError> {
        let Some(&b0) = l.first() else {
            return Ok(());
        };
        if self.flags.ready(b0) {
            return Ok(());
        }
        self.flags.set_ready(b0);
        if self.b.kind(b0).simple_obj {
            if let Some(al) = find_simple_object(&self.a, &self.b, l) {
                self.flags.set_needed(al[0]);
                let name = self.a.cmd(al[0]).name.clone();
                self.b.cmd_mut(b0).name = name;
                return Ok(());
            }
        }
        if self.b.is_fixed_name(b0) {
            let prefix = self.b.kind(b0).prefix.as_str();
            let name = self.b.cmd(b0).name.as_str();
            if !self.a.contains(prefix, name)
                && matches!(prefix, "aaa-server" | "ldap attribute-map")
            {
                return Err(DiffError::ManualTransfer {
                    prefix: prefix.to_string(),
                    name: name.to_string(),
                });
            }
        }
        for &c in l {
            self.follow_add(c)?;
            for sc in self.b.cmd(c).sub.clone() {
                self.follow_add(sc)?;
            }
            self.add_cmd(c);
        }
        Ok(())
    }

    fn follow_add(&mut self, c: CmdId) -> Result<(), DiffError> {
        for r in self.b.cmd(c).refs.clone() {
            let bl = self.b.list(&r.prefix, &r.name);
            let Some(&b0) = bl.first() else {
                continue;
            };
            // Fixed-name object on device is changed, not added again.
            if self.b.is_fixed_name(b0) {
                if let Some(al) = self.a.get(&r.prefix, &r.name).map(<[CmdId]>::to_vec) {
                    if r.prefix == "crypto map" {
                        self.diff_crypto_map(al, bl)?;
                    } else {
                        self.diff_cmds(al, bl, Key::Parsed)?;
                    }
                    continue;
                }
            }
            self.add_cmds(&bl)?;
        }
        Ok(())
    }

    pub(crate) fn add_cmd(&mut self, c: CmdId) {
        if matches!(
            self.b.kind(c).prefix.as_str(),
            "aaa-server" | "ldap attribute-map" | "interface"
        ) {
            return;
        }
        let pr = self.b.printable(c);
        if let Some(sup) = self.b.cmd(c).parent {
            let pr2 = self.b.printable(sup);
            self.set_cmd_conf_mode(pr2);
        } else if !self.b.kind(c).sub.is_empty() {
            self.sub_cmd_of = pr.clone();
        } else {
            self.sub_cmd_of.clear();
        }
        self.add_change(pr);
        for sub in self.b.cmd(c).sub.clone() {
            let p = self.b.printable(sub);
            self.add_change(p);
        }
    }

    /// Enter configuration mode of `printed_sup` unless already active.
    pub(crate) fn set_cmd_conf_mode(&mut self, printed_sup: String) {
        if self.sub_cmd_of != printed_sup {
            // Top-level command "webvpn" must not be given in mode of
            // group-policy, which has a subcommand of same name.
            if !self.sub_cmd_of.is_empty() {
                self.add_change("exit".to_string());
            }
            self.add_change(printed_sup.clone());
            self.sub_cmd_of = printed_sup;
        }
    }

    /// Delete subcommands and parts of multi-line commands.
    pub(crate) fn del_cmds(&mut self, l: &[CmdId]) {
        let Some(&c0) = l.first() else {
            return;
        };
        if self.a.kind(c0).prefix == "interface" {
            return;
        }
        for &c in l {
            if self.flags.needed(c) {
                continue;
            }
            if let Some(sup) = self.a.cmd(c).parent {
                let orig = self.a.cmd(sup).orig.clone();
                self.set_cmd_conf_mode(orig);
            } else {
                self.sub_cmd_of.clear();
            }
            // Not deleted again later.
            self.flags.set_needed(c);
            let chg = format!("no {}", self.a.cmd(c).orig);
            self.add_change(chg);
        }
        self.mark_deleted(l);
    }

    /// Mark device commands and everything they reference as deletable.
    pub(crate) fn mark_deleted(&mut self, al: &[CmdId]) {
        let Some(&c0) = al.first() else {
            return;
        };
        if matches!(
            self.a.kind(c0).prefix.as_str(),
            "aaa-server" | "ldap attribute-map" | "interface"
        ) {
            return;
        }
        for &c in al {
            if self.flags.to_delete(c) {
                continue;
            }
            self.flags.set_to_delete(c);
            self.follow_delete(c);
            for sc in self.a.cmd(c).sub.clone() {
                self.follow_delete(sc);
            }
        }
    }

    fn follow_delete(&mut self, c: CmdId) {
        for r in self.a.cmd(c).refs.clone() {
            let l = self.a.list(&r.prefix, &r.name);
            self.mark_deleted(&l);
        }
    }

    /// Delete top-level commands from device that were referenced before
    /// or were left over from an earlier, failed run.
    ///
    /// Commands are deleted only after all commands referencing them.
    fn delete_unused(&mut self) -> Result<(), DiffError> {
        let mut to_delete: BTreeMap<(String, String), Vec<CmdId>> = BTreeMap::new();
        for (prefix, m) in &self.a.lookup {
            for (name, l) in m {
                let del: Vec<CmdId> = l
                    .iter()
                    .copied()
                    .filter(|&c| {
                        !self.flags.needed(c)
                            && (self.flags.to_delete(c) || self.a.cmd(c).name.contains("-DRC-"))
                    })
                    .collect();
                if !del.is_empty() {
                    to_delete.insert((prefix.clone(), name.clone()), del);
                }
            }
        }
        if !to_delete.is_empty() && !self.sub_cmd_of.is_empty() {
            self.add_change("exit".to_string());
            self.sub_cmd_of.clear();
        }
        while !to_delete.is_empty() {
            let mut referenced: HashSet<(String, String)> = HashSet::new();
            for l in to_delete.values() {
                for &c in l {
                    let cmd = self.a.cmd(c);
                    for &id in std::iter::once(&c).chain(&cmd.sub) {
                        for r in &self.a.cmd(id).refs {
                            referenced.insert((r.prefix.clone(), r.name.clone()));
                        }
                    }
                }
            }
            let free: Vec<(String, String)> = to_delete
                .keys()
                .filter(|k| !referenced.contains(*k))
                .cloned()
                .collect();
            if free.is_empty() {
                return Err(DiffError::ReferenceCycle {
                    objects: to_delete
                        .keys()
                        .map(|(prefix, name)| format!("{prefix} {name}"))
                        .collect(),
                });
            }
            for key in free {
                let Some(l) = to_delete.remove(&key) else {
                    continue;
                };
                let (prefix, name) = key;
                if l.first().is_some_and(|&c| self.a.kind(c).clear_conf) {
                    self.add_change(format!("clear configure {prefix} {name}"));
                    continue;
                }
                for c in l {
                    let orig = &self.a.cmd(c).orig;
                    let chg = match orig.strip_prefix("no ") {
                        Some(positive) => positive.to_string(),
                        None => format!("no {orig}"),
                    };
                    self.add_change(chg);
                }
            }
        }
        Ok(())
    }

    /// Give each target command that may be renamed a name not used on
    /// device: `<name>-DRC-<index>`.
    fn generate_names(&mut self) {
        let mut renames = Vec::new();
        for (prefix, m) in &self.b.lookup {
            let device_names = self.a.lookup.get(prefix);
            let taken = |n: &str| device_names.is_some_and(|m| m.contains_key(n));
            for l in m.values() {
                for &c in l {
                    if self.b.is_fixed_name(c) {
                        continue;
                    }
                    let base = &self.b.cmd(c).name;
                    let mut index = 0;
                    let name = loop {
                        let name = format!("{base}-DRC-{index}");
                        if !taken(&name) {
                            break name;
                        }
                        index += 1;
                    };
                    renames.push((c, name));
                }
            }
        }
        for (c, name) in renames {
            self.b.cmd_mut(c).name = name;
        }
    }
}

pub(crate) fn is_ios_acl_line(cf: &Configuration, id: CmdId) -> bool {
    cf.cmd(id)
        .parent
        .is_some_and(|p| cf.kind(p).prefix == "ip access-list extended")
}
