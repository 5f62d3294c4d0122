//! Matching of crypto map entries by remote peer.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::config::{CmdId, Configuration};

/// Crypto map entry without `set peer` or dynamic map.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Missing peer or dynamic in crypto map {name} {seq}")]
pub struct MissingPeer {
    pub name: String,
    pub seq: usize,
}

/// Entries of two crypto maps having the same peer.
///
/// Either side may be empty. Entries only found in `b` get a fresh
/// sequence number in `new_seq`.
#[derive(Debug)]
pub(crate) struct SeqPair {
    pub a: Vec<CmdId>,
    pub b: Vec<CmdId>,
    pub new_seq: Option<usize>,
}

fn by_seq(cf: &Configuration, l: &[CmdId]) -> BTreeMap<usize, Vec<CmdId>> {
    let mut m: BTreeMap<usize, Vec<CmdId>> = BTreeMap::new();
    for &id in l {
        m.entry(cf.cmd(id).seq).or_default().push(id);
    }
    m
}

/// Identity of the remote side of one crypto map entry.
///
/// This is `peer ADDR` for static peers or the name of the referenced
/// dynamic map.
fn peer_of(cf: &Configuration, l: &[CmdId]) -> Result<String, MissingPeer> {
    let Some(&first) = l.first() else {
        return Err(MissingPeer {
            name: String::new(),
            seq: 0,
        });
    };
    let c0 = cf.cmd(first);
    let mut entries = l;
    // IOS stores settings as subcommands.
    if l.len() == 1 && !c0.sub.is_empty() {
        entries = &c0.sub;
    }
    for &id in entries {
        let c = cf.cmd(id);
        if let Some((_, peer)) = c.parsed.split_once("set peer ") {
            return Ok(format!("peer {peer}"));
        }
        if let Some((_, dynamic)) = c.parsed.split_once("ipsec-isakmp dynamic ") {
            return Ok(c
                .refs
                .first()
                .map(|r| r.name.clone())
                .unwrap_or_else(|| dynamic.to_string()));
        }
    }
    Err(MissingPeer {
        name: c0.name.clone(),
        seq: c0.seq,
    })
}

/// Pair entries of crypto map `al` in `ca` with entries of `bl` in `cb`.
///
/// Entries of `al` come first in ascending sequence order, followed by
/// entries only found in `bl`. New static entries count up from 1, new
/// dynamic entries count down from 65535, skipping numbers used in `al`.
pub(crate) fn match_crypto_map(
    ca: &Configuration,
    al: &[CmdId],
    cb: &Configuration,
    bl: &[CmdId],
) -> Result<Vec<SeqPair>, MissingPeer> {
    let a_seq = by_seq(ca, al);
    let mut b_seq = by_seq(cb, bl);
    let mut b_peer_to_seq = HashMap::new();
    for (&seq, l) in &b_seq {
        b_peer_to_seq.insert(peer_of(cb, l)?, seq);
    }

    let mut result = Vec::new();
    for (_, a_list) in &a_seq {
        let peer = peer_of(ca, a_list)?;
        let b = b_peer_to_seq
            .get(&peer)
            .and_then(|seq| b_seq.remove(seq))
            .unwrap_or_default();
        result.push(SeqPair {
            a: a_list.clone(),
            b,
            new_seq: None,
        });
    }

    let mut next_static = 1;
    let mut next_dynamic = 65535;
    for (_, b_list) in b_seq {
        let is_static = peer_of(cb, &b_list)?.starts_with("peer ");
        let seq = if is_static {
            while a_seq.contains_key(&next_static) {
                next_static += 1;
            }
            next_static += 1;
            next_static - 1
        } else {
            while a_seq.contains_key(&next_dynamic) {
                next_dynamic -= 1;
            }
            next_dynamic -= 1;
            next_dynamic + 1
        };
        result.push(SeqPair {
            a: Vec::new(),
            b: b_list,
            new_seq: Some(seq),
        });
    }
    Ok(result)
}

/// Give new entries their sequence number and the name of the existing map.
pub(crate) fn renumber(cb: &mut Configuration, pair: &SeqPair, map_name: Option<&str>) {
    let Some(seq) = pair.new_seq else {
        return;
    };
    for &id in &pair.b {
        let c = cb.cmd_mut(id);
        c.seq = seq;
        if let Some(name) = map_name {
            c.name = name.to_string();
        }
    }
}
