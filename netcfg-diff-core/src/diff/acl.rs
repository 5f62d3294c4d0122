//! Ordered diff of access-lists and equalization of object-groups.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{CmdId, Configuration};
use crate::diff::edit::{self, Edit};
use crate::diff::engine::{DiffError, Key, Session};

/// Line numbers of ACL lines of device and target during one ACL diff.
#[derive(Debug, Default)]
struct Positions {
    a: HashMap<CmdId, usize>,
    b: HashMap<CmdId, usize>,
}

impl Positions {
    /// Adjust positions after a line was inserted before `at`.
    fn inserted(&mut self, at: usize) {
        for p in self.a.values_mut().chain(self.b.values_mut()) {
            if *p >= at {
                *p += 1;
            }
        }
    }

    /// Adjust positions after line at `at` was removed.
    fn removed(&mut self, at: usize) {
        for p in self.a.values_mut().chain(self.b.values_mut()) {
            if *p > at {
                *p -= 1;
            }
        }
    }
}

fn asa_log_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| {
        Regex::new(r" log( ((\w+ )?interval \d+|\w+|disable|default))?\b")
            .expect("valid log pattern")
    })
}

fn ios_log_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r" log(?:-input)?").expect("valid log pattern"))
}

/// `access-list NAME ...` to `access-list NAME line N ...`
fn insert_line_nr(s: &str, pos: usize) -> String {
    let l = "access-list ".len();
    match s.get(l..).and_then(|rest| rest.find(' ')) {
        Some(i) => format!("{} line {}{}", &s[..l + i], pos + 1, &s[l + i..]),
        None => s.to_string(),
    }
}

/// Sort members of object-groups, so equal groups are found independent
/// of member order.
pub(crate) fn sort_groups(cf: &mut Configuration) {
    let groups: Vec<CmdId> = cf
        .lookup
        .get("object-group")
        .map(|m| m.values().filter_map(|l| l.first().copied()).collect())
        .unwrap_or_default();
    for g in groups {
        let mut sub = std::mem::take(&mut cf.cmd_mut(g).sub);
        sub.sort_by(|&x, &y| cf.cmd(x).parsed.cmp(&cf.cmd(y).parsed));
        cf.cmd_mut(g).sub = sub;
    }
}

fn ios_action(cf: &Configuration, id: CmdId) -> &str {
    let p = cf.cmd(id).parsed.as_str();
    p.split_once(' ').map_or(p, |(action, _)| action)
}

/// Sort lines inside blocks of successive lines with identical action,
/// because order doesn't matter there. This finds lines as unchanged if
/// only their order has changed.
///
/// Lines are never moved across a block border, so the line that permits
/// management traffic is never moved. Remark lines split a block into
/// segments that are sorted separately. The original position of each
/// line is stored in `seq`.
pub(crate) fn sort_ios_blocks(cf: &mut Configuration, l: &mut [CmdId]) {
    for (i, &c) in l.iter().enumerate() {
        cf.cmd_mut(c).seq = i;
    }
    let sort_segment = |cf: &Configuration, seg: &mut [CmdId]| {
        seg.sort_by(|&x, &y| cf.cmd(x).parsed.cmp(&cf.cmd(y).parsed));
    };
    let mut start = 0;
    let mut action = String::new();
    for i in 0..l.len() {
        let a = ios_action(cf, l[i]);
        if a == "remark" {
            sort_segment(cf, &mut l[start..i]);
            start = i + 1;
        } else if a != action {
            sort_segment(cf, &mut l[start..i]);
            action = a.to_string();
            start = i;
        }
    }
    sort_segment(cf, &mut l[start..]);
}

impl Session {
    fn asa_add_acl(&mut self, pos: &mut Positions, b: CmdId) -> Result<(), DiffError> {
        let at = pos.b.get(&b).copied().unwrap_or_default();
        let parsed = insert_line_nr(&self.b.cmd(b).parsed, at);
        self.b.cmd_mut(b).parsed = parsed;
        self.add_cmds(&[b])?;
        pos.inserted(at);
        Ok(())
    }

    fn asa_del_acl(&mut self, pos: &mut Positions, a: CmdId) {
        let at = pos.a.get(&a).copied().unwrap_or_default();
        let orig = insert_line_nr(&self.a.cmd(a).orig, at);
        self.a.cmd_mut(a).orig = orig;
        self.del_cmds(&[a]);
        pos.removed(at);
    }

    /// Join delete command of a moved line with its add command.
    ///
    /// Changes from `i` up to the end are
    /// `no access-list ..`, optional object-group commands, `access-list ..`.
    /// They become the object-group commands followed by a single change
    /// holding both access-list commands.
    fn join_move(&mut self, i: usize) {
        let changes = &mut self.result.changes;
        if i + 1 >= changes.len() {
            return;
        }
        let del = changes.remove(i);
        if let Some(add) = changes.pop() {
            changes.push(format!("{del}\n{add}"));
        }
    }

    pub(crate) fn diff_asa_acls(
        &mut self,
        al: &[CmdId],
        bl: &[CmdId],
        diff: &[Edit],
    ) -> Result<(), DiffError> {
        let mut add = Vec::new();
        let mut del = Vec::new();
        let mut pos = Positions::default();

        // Find identical groups early, equalize groups later.
        for e in diff.iter().filter(|e| e.is_insert()) {
            for &c in &bl[e.b.clone()] {
                for r in self.b.cmd(c).refs.clone() {
                    self.find_group_on_device(&r.name);
                }
            }
        }
        for e in diff {
            if e.is_insert() {
                for &c in &bl[e.b.clone()] {
                    pos.b.insert(c, e.a.start);
                }
                add.extend_from_slice(&bl[e.b.clone()]);
            } else if e.is_delete() {
                for (i, &c) in al[e.a.clone()].iter().enumerate() {
                    pos.a.insert(c, e.a.start + i);
                }
                del.extend_from_slice(&al[e.a.clone()]);
            } else {
                // Lines are equal if referenced groups are assumed equal.
                for (i, (&a, &b)) in al[e.a.clone()].iter().zip(&bl[e.b.clone()]).enumerate() {
                    let name = self.a.cmd(a).name.clone();
                    self.b.cmd_mut(b).name = name;
                    pos.a.insert(a, e.a.start + i);
                    pos.b.insert(b, e.a.start + i);
                    let a_refs = self.a.cmd(a).refs.clone();
                    let b_refs = self.b.cmd(b).refs.clone();
                    let mut changed_ref = false;
                    for (ar, br) in a_refs.iter().zip(&b_refs) {
                        if !self.equalized_groups(&ar.name, &br.name)? {
                            changed_ref = true;
                        }
                    }
                    if changed_ref {
                        add.push(b);
                        del.push(a);
                    } else {
                        self.flags.set_needed(a);
                        self.flags.set_ready(b);
                    }
                }
            }
        }

        // Lines differing only in log attribute can't both be present on
        // device. Such lines are deleted and added in a single change.
        let rx = asa_log_rx();
        let mut del_map: HashMap<String, CmdId> = del
            .iter()
            .map(|&a| (rx.replace_all(&self.a.printable(a), "").into_owned(), a))
            .collect();
        for b in add {
            let p = rx.replace_all(&self.b.printable(b), "").into_owned();
            match del_map.remove(&p) {
                Some(a) => {
                    let before = self.result.changes.len();
                    self.asa_del_acl(&mut pos, a);
                    // Index of delete command, behind a possible mode line.
                    let moved = (self.result.changes.len() > before)
                        .then(|| self.result.changes.len() - 1);
                    self.asa_add_acl(&mut pos, b)?;
                    if let Some(i) = moved {
                        self.join_move(i);
                    }
                }
                None => self.asa_add_acl(&mut pos, b)?,
            }
        }
        // Work from bottom to top, otherwise too much traffic would be
        // permitted for a short time.
        for &a in del.iter().rev() {
            if !self.flags.needed(a) {
                self.asa_del_acl(&mut pos, a);
            }
        }
        Ok(())
    }

    /// Try to change members of device group `a_name` to members of target
    /// group `b_name`, so both groups become equal.
    fn equalized_groups(&mut self, a_name: &str, b_name: &str) -> Result<bool, DiffError> {
        let (Some(ga), Some(gb)) = (
            self.a.get("object-group", a_name).and_then(|l| l.first().copied()),
            self.b.get("object-group", b_name).and_then(|l| l.first().copied()),
        ) else {
            return Ok(false);
        };
        // Type of object-group differs.
        if self.a.cmd(ga).parsed != self.b.cmd(gb).parsed {
            return Ok(false);
        }
        if self.flags.needed(ga) {
            if self.flags.ready(gb) {
                return Ok(self.a.cmd(ga).name == self.b.cmd(gb).name);
            }
            self.find_group_on_device(b_name);
            return Ok(false);
        }
        let la = self.a.cmd(ga).sub.clone();
        let lb = self.b.cmd(gb).sub.clone();
        let script = edit::myers(&Key::Orig.list(&self.a, &la), &Key::Orig.list(&self.b, &lb));
        if !edit::is_identity(&script) {
            self.find_group_on_device(b_name);
            if self.flags.ready(gb) {
                return Ok(a_name == self.b.cmd(gb).name);
            }
        }
        let (ins, del) = edit::stat(&script);
        if (ins + del) as f64 > self.tuning.object_group_edit_ratio * lb.len() as f64 {
            return Ok(false);
        }
        self.flags.set_needed(ga);
        let name = self.a.cmd(ga).name.clone();
        self.b.cmd_mut(gb).name = name;
        for e in &script {
            if e.is_delete() {
                self.del_cmds(&la[e.a.clone()]);
            } else if e.is_insert() {
                self.add_cmds(&lb[e.b.clone()])?;
            }
        }
        self.flags.set_ready(gb);
        Ok(true)
    }

    /// Use an unused device group with identical members for target group
    /// `name`.
    fn find_group_on_device(&mut self, name: &str) {
        let Some(gb) = self.b.get("object-group", name).and_then(|l| l.first().copied()) else {
            return;
        };
        if self.flags.ready(gb) {
            return;
        }
        let b_cmd = self.b.cmd(gb);
        let found = self.a.lookup.get("object-group").and_then(|m| {
            m.values().filter_map(|l| l.first().copied()).find(|&ga| {
                let a_cmd = self.a.cmd(ga);
                a_cmd.parsed == b_cmd.parsed
                    && !self.flags.needed(ga)
                    && a_cmd.sub.len() == b_cmd.sub.len()
                    && a_cmd
                        .sub
                        .iter()
                        .zip(&b_cmd.sub)
                        .all(|(&x, &y)| self.a.cmd(x).orig == self.b.cmd(y).orig)
            })
        });
        if let Some(ga) = found {
            self.flags.set_needed(ga);
            self.flags.set_ready(gb);
            let name = self.a.cmd(ga).name.clone();
            self.b.cmd_mut(gb).name = name;
        }
    }

    /// Find action of block at insert position `at` of sorted device ACL.
    ///
    /// Returns `None` at the border of two blocks.
    fn inside_block(&self, al: &[CmdId], at: usize) -> Option<String> {
        let cf = &self.a;
        let low = al[..at]
            .iter()
            .rev()
            .map(|&c| ios_action(cf, c))
            .find(|&a| a != "remark");
        let high = al[at..]
            .iter()
            .map(|&c| ios_action(cf, c))
            .find(|&a| a != "remark");
        match (low, high) {
            (Some(l), Some(h)) if l == h => Some(l.to_string()),
            _ => None,
        }
    }

    /// Restore original order of the block around position `at`.
    fn unsort_block(&self, al: &mut [CmdId], at: usize) {
        if at >= al.len() {
            return;
        }
        let action = ios_action(&self.a, al[at]).to_string();
        let mut low = at;
        for i in (0..at).rev() {
            match ios_action(&self.a, al[i]) {
                "remark" => {}
                a if a == action => low = i,
                _ => break,
            }
        }
        let mut high = at;
        for i in at + 1..al.len() {
            match ios_action(&self.a, al[i]) {
                "remark" => {}
                a if a == action => high = i,
                _ => break,
            }
        }
        al[low..=high].sort_by_key(|&c| self.a.cmd(c).seq);
    }

    pub(crate) fn diff_ios_acls(
        &mut self,
        mut al: Vec<CmdId>,
        bl: Vec<CmdId>,
        mut diff: Vec<Edit>,
    ) -> Result<(), DiffError> {
        let acl_name = self
            .a
            .cmd(al[0])
            .parent
            .map(|p| self.a.cmd(p).name.clone())
            .unwrap_or_default();
        let limit = self.tuning.acl_insert_limit.min(9999);
        let prev_mode = std::mem::take(&mut self.sub_cmd_of);
        self.add_change(format!("ip access-list resequence {acl_name} 10000 10000"));
        let chg_len = self.result.changes.len();

        // Dangerous case where a block must not be sorted: a deny line is
        // inserted into a block of permit lines or vice versa.
        let mut renew = false;
        for e in diff.iter().filter(|e| e.is_insert()) {
            if let Some(action) = self.inside_block(&al, e.a.start) {
                if bl[e.b.clone()]
                    .iter()
                    .any(|&c| ios_action(&self.b, c) != action)
                {
                    self.unsort_block(&mut al, e.a.start);
                    renew = true;
                }
            }
        }
        if renew {
            diff = edit::myers(&Key::Parsed.list(&self.a, &al), &Key::Parsed.list(&self.b, &bl));
        }

        // Lines were sorted; original position is taken from seq.
        let mut pos = Positions::default();
        for &c in &al {
            pos.a.insert(c, (self.a.cmd(c).seq + 1) * 10000);
        }
        let mut add = Vec::new();
        let mut del = Vec::new();
        for e in &diff {
            if e.is_insert() {
                if e.b.len() > limit {
                    return Err(DiffError::KeyspaceExceeded { limit });
                }
                for (i, &c) in bl[e.b.clone()].iter().enumerate() {
                    pos.b.insert(c, e.a.start * 10000 + i + 1);
                }
                add.extend_from_slice(&bl[e.b.clone()]);
            } else if e.is_delete() {
                del.extend_from_slice(&al[e.a.clone()]);
            }
        }

        let rx = ios_log_rx();
        let mut del_map: HashMap<String, CmdId> = del
            .iter()
            .map(|&a| (rx.replace_all(&self.a.printable(a), "").into_owned(), a))
            .collect();
        for b in add {
            let p = rx.replace_all(&self.b.printable(b), "").into_owned();
            match del_map.remove(&p) {
                Some(a) => {
                    let before = self.result.changes.len();
                    self.ios_del_acl(&pos, a);
                    // Index of delete command, behind a possible mode line.
                    let moved = (self.result.changes.len() > before)
                        .then(|| self.result.changes.len() - 1);
                    self.ios_add_acl(&pos, b)?;
                    if let Some(i) = moved {
                        self.join_move(i);
                    }
                }
                None => self.ios_add_acl(&pos, b)?,
            }
        }
        for &a in del.iter().rev() {
            if !self.flags.needed(a) {
                self.ios_del_acl(&pos, a);
            }
        }

        if self.result.changes.len() == chg_len {
            self.result.changes.pop();
            self.sub_cmd_of = prev_mode;
        } else {
            self.sub_cmd_of.clear();
            self.add_change(format!("ip access-list resequence {acl_name} 10 10"));
        }
        Ok(())
    }

    fn ios_add_acl(&mut self, pos: &Positions, b: CmdId) -> Result<(), DiffError> {
        let nr = pos.b.get(&b).copied().unwrap_or_default();
        let parsed = format!("{nr} {}", self.b.cmd(b).parsed);
        self.b.cmd_mut(b).parsed = parsed;
        self.add_cmds(&[b])
    }

    fn ios_del_acl(&mut self, pos: &Positions, a: CmdId) {
        let nr = pos.a.get(&a).copied().unwrap_or_default();
        self.a.cmd_mut(a).orig = nr.to_string();
        self.del_cmds(&[a]);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{insert_line_nr, sort_ios_blocks};
    use crate::dialect::Model;
    use crate::parser::parse;

    #[test]
    fn line_number_follows_name() {
        assert_eq!(
            insert_line_nr("access-list a extended permit ip any4 any4", 0),
            "access-list a line 1 extended permit ip any4 any4"
        );
        assert_eq!(insert_line_nr("access-list", 3), "access-list");
    }

    #[test]
    fn ios_blocks_are_sorted_separately() {
        let grammar = Model::Ios.grammar().expect("grammar");
        let mut cfg = parse(
            &grammar,
            "ip access-list extended a\n \
             permit ip host 10.0.0.2 any\n \
             permit ip host 10.0.0.1 any\n \
             deny ip host 10.0.0.9 any\n \
             deny ip host 10.0.0.8 any\n \
             remark x\n \
             deny ip host 10.0.0.7 any\n \
             permit ip host 10.0.0.3 any\n",
            false,
        )
        .expect("parse");
        let acl = cfg.get("ip access-list extended", "a").expect("acl")[0];
        let mut l = cfg.cmd(acl).sub.clone();
        sort_ios_blocks(&mut cfg, &mut l);
        let lines: Vec<(String, usize)> = l
            .iter()
            .map(|&id| (cfg.cmd(id).parsed.clone(), cfg.cmd(id).seq))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("permit ip host 10.0.0.1 any".to_string(), 1),
                ("permit ip host 10.0.0.2 any".to_string(), 0),
                ("deny ip host 10.0.0.8 any".to_string(), 3),
                ("deny ip host 10.0.0.9 any".to_string(), 2),
                ("remark x".to_string(), 4),
                ("deny ip host 10.0.0.7 any".to_string(), 5),
                ("permit ip host 10.0.0.3 any".to_string(), 6),
            ]
        );
    }
}
