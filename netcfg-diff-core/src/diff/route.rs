//! Static routes.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};

use crate::config::{CmdId, Configuration};
use crate::diff::edit::Edit;
use crate::diff::engine::Session;

/// Destination of a route. Two routes to the same destination can't
/// exist on device at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RouteDst {
    pub vrf: String,
    /// Network and prefix length, `None` if unparsable.
    pub dst: Option<(IpAddr, u8)>,
}

fn mask_len(mask: Ipv4Addr) -> u8 {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    // Non-contiguous masks have no length.
    if ones < 32 && bits << ones != 0 {
        return 0;
    }
    ones as u8
}

/// ASA: `route INTF IP MASK GW`, `ipv6 route INTF IP/LEN GW`
///
/// IOS: `ip route [vrf NAME] IP MASK GW`, `ipv6 route [vrf NAME] IP/LEN GW`
pub(crate) fn dst_of_route(cf: &Configuration, id: CmdId) -> RouteDst {
    let l: Vec<&str> = cf.cmd(id).parsed.split(' ').collect();
    let mut vrf = String::new();
    let dst = if cf.kind(id).prefix == "ipv6 route" {
        if l.len() >= 6 && l[2] == "vrf" {
            vrf = l[3].to_string();
        }
        l.iter()
            .find(|w| w.contains('/'))
            .and_then(|w| w.split_once('/'))
            .and_then(|(ip, len)| Some((ip.parse::<IpAddr>().ok()?, len.parse::<u8>().ok()?)))
    } else {
        let mut i = 2;
        if l.first() == Some(&"ip") && l.get(2) == Some(&"vrf") {
            vrf = l.get(3).copied().unwrap_or_default().to_string();
            i = 4;
        }
        let ip = l.get(i).and_then(|w| w.parse::<IpAddr>().ok());
        let mask = l.get(i + 1).and_then(|w| w.parse::<Ipv4Addr>().ok());
        match (ip, mask) {
            (Some(ip), Some(mask)) => Some((ip, mask_len(mask))),
            _ => None,
        }
    };
    RouteDst { vrf, dst }
}

/// Sort routes with long mask first. When the default route is switched,
/// the new routes are available before the old default route is removed.
pub(crate) fn sort_routes(cf: &mut Configuration) {
    for prefix in ["route", "ip route", "ipv6 route"] {
        let Some(mut l) = cf.get(prefix, "").map(<[CmdId]>::to_vec) else {
            continue;
        };
        l.sort_by_cached_key(|&id| {
            let bits = dst_of_route(cf, id).dst.map_or(-1, |(_, len)| i16::from(len));
            (128 - bits, cf.cmd(id).parsed.clone())
        });
        cf.set(prefix, "", l);
    }
}

impl Session {
    pub(crate) fn diff_routes(&mut self, al: &[CmdId], bl: &[CmdId], diff: &[Edit]) {
        // Routes are top-level commands and leave any configuration mode.
        self.sub_cmd_of.clear();
        let changed_vrfs: HashSet<String> =
            bl.iter().map(|&c| dst_of_route(&self.b, c).vrf).collect();
        let mut del_dst: HashMap<RouteDst, CmdId> = HashMap::new();
        for e in diff.iter().filter(|e| e.is_delete()) {
            for &c in &al[e.a.clone()] {
                del_dst.insert(dst_of_route(&self.a, c), c);
            }
        }
        for e in diff.iter().filter(|e| e.is_insert()) {
            for &c in &bl[e.b.clone()] {
                let add = self.b.printable(c);
                self.flags.set_ready(c);
                match del_dst.get(&dst_of_route(&self.b, c)) {
                    // Two routes to identical destination aren't allowed.
                    // Remove and add in one transaction.
                    Some(&del) if !self.flags.needed(del) => {
                        let chg = format!("no {}\n{add}", self.a.cmd(del).orig);
                        self.add_change(chg);
                        self.flags.set_needed(del);
                    }
                    _ => self.add_change(add),
                }
            }
        }
        let mut seen = HashSet::new();
        for e in diff.iter().filter(|e| e.is_delete()) {
            for &c in &al[e.a.clone()] {
                let ipv = if self.a.cmd(c).parsed.contains("ipv6") {
                    "ipv6"
                } else {
                    "IPv4"
                };
                let vrf = dst_of_route(&self.a, c).vrf;
                if changed_vrfs.contains(&vrf) {
                    self.del_cmds(&[c]);
                } else if seen.insert(format!("{ipv}{vrf}")) {
                    let for_vrf = if vrf.is_empty() {
                        String::new()
                    } else {
                        format!(" for VRF {vrf}")
                    };
                    self.note(format!(
                        "No {ipv} routing specified{for_vrf}, leaving untouched"
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use pretty_assertions::assert_eq;

    use super::{dst_of_route, sort_routes};
    use crate::dialect::Model;
    use crate::parser::parse;

    #[test]
    fn route_destinations() {
        let grammar = Model::Ios.grammar().expect("grammar");
        let cfg = parse(
            &grammar,
            "ip route vrf v1 10.1.0.0 255.255.0.0 10.9.9.9\n\
             ip route 0.0.0.0 0.0.0.0 10.9.9.1\n\
             ipv6 route vrf v2 2001:db8::/32 2001:db8::1\n",
            false,
        )
        .expect("parse");
        let l = cfg.get("ip route", "").expect("routes");
        let dsts: Vec<_> = l.iter().map(|&id| dst_of_route(&cfg, id)).collect();
        assert_eq!(dsts[0].vrf, "v1");
        assert_eq!(
            dsts[0].dst,
            Some(("10.1.0.0".parse::<IpAddr>().expect("ip"), 16))
        );
        assert_eq!(dsts[1].vrf, "");
        assert_eq!(dsts[1].dst.map(|(_, len)| len), Some(0));

        let v6 = cfg.get("ipv6 route", "").expect("routes")[0];
        let dst = dst_of_route(&cfg, v6);
        assert_eq!(dst.vrf, "v2");
        assert_eq!(dst.dst.map(|(_, len)| len), Some(32));
    }

    #[test]
    fn most_specific_route_first() {
        let grammar = Model::Asa.grammar().expect("grammar");
        let mut cfg = parse(
            &grammar,
            "route outside 0.0.0.0 0.0.0.0 10.1.1.1\n\
             route inside 10.2.0.0 255.255.0.0 10.3.3.3\n\
             route inside 10.2.2.0 255.255.255.0 10.3.3.3\n",
            false,
        )
        .expect("parse");
        sort_routes(&mut cfg);
        let l: Vec<String> = cfg
            .get("route", "")
            .expect("routes")
            .iter()
            .map(|&id| cfg.cmd(id).orig.clone())
            .collect();
        assert_eq!(
            l,
            vec![
                "route inside 10.2.2.0 255.255.255.0 10.3.3.3",
                "route inside 10.2.0.0 255.255.0.0 10.3.3.3",
                "route outside 0.0.0.0 0.0.0.0 10.1.1.1",
            ]
        );
    }
}
