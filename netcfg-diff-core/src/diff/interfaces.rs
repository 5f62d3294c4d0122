//! Interfaces and VRFs.
//!
//! Interfaces are never added or removed. Target interfaces must exist on
//! device with matching attributes, only their subcommands are changed.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::{CmdId, Configuration};
use crate::dialect::Model;
use crate::diff::engine::{DiffError, Session};

/// Attributes of an IOS interface, removed from its subcommands.
#[derive(Debug, PartialEq, Eq)]
struct IntfInfo {
    shut: bool,
    addr: String,
    inspect: &'static str,
    vrf: String,
}

/// Read and remove subcommands of an IOS interface that must not be
/// compared later.
fn extract_intf_info(cf: &mut Configuration, id: CmdId) -> IntfInfo {
    let mut info = IntfInfo {
        shut: false,
        addr: String::new(),
        inspect: "disabled",
        vrf: "<global>".to_string(),
    };
    let mut addr_list = Vec::new();
    let mut keep = Vec::new();
    for sc in cf.cmd(id).sub.clone() {
        let p = cf.cmd(sc).parsed.as_str();
        if p == "shutdown" {
            info.shut = true;
        } else if let Some(ip) = p.strip_prefix("ip address ") {
            addr_list.push(ip.trim_end_matches(" secondary").to_string());
        } else if p.starts_with("ip unnumbered ") {
            addr_list.push("unnumbered".to_string());
        } else if let Some((_, v)) = p.split_once("vrf forwarding ") {
            info.vrf = v.to_string();
        } else if p.starts_with("ip inspect") {
            info.inspect = "enabled";
        } else {
            keep.push(sc);
        }
    }
    cf.cmd_mut(id).sub = keep;
    addr_list.sort();
    info.addr = addr_list.join(",");
    info
}

/// Interface name of `interface NAME`.
fn intf_name(cf: &Configuration, id: CmdId) -> String {
    cf.cmd(id)
        .parsed
        .split(' ')
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

/// Interfaces referenced by `access-group ... interface INTF` and
/// `crypto map ... interface INTF`. Global access-group is ignored.
fn implicit_interfaces(cf: &Configuration) -> BTreeSet<String> {
    let mut m = BTreeSet::new();
    for &c in cf.get("access-group", "").unwrap_or_default() {
        let tokens: Vec<&str> = cf.cmd(c).parsed.split(' ').collect();
        if tokens.len() == 5 {
            m.insert(tokens[4].to_string());
        }
    }
    for &c in cf.get("crypto map interface", "").unwrap_or_default() {
        if let Some(intf) = cf.cmd(c).parsed.split(' ').nth(4) {
            m.insert(intf.to_string());
        }
    }
    m
}

fn interface_vrf(cf: &Configuration, id: CmdId) -> String {
    cf.cmd(id)
        .sub
        .iter()
        .find_map(|&s| {
            cf.cmd(s)
                .orig
                .split_once("vrf forwarding ")
                .map(|(_, v)| v.to_string())
        })
        .unwrap_or_default()
}

fn route_vrf(cf: &Configuration, id: CmdId) -> String {
    let tokens: Vec<&str> = cf.cmd(id).parsed.split(' ').collect();
    match tokens.get(2..4) {
        Some(["vrf", v]) => v.to_string(),
        _ => String::new(),
    }
}

type VrfOf = fn(&Configuration, CmdId) -> String;

const VRF_USERS: [(&str, VrfOf); 2] = [("interface", interface_vrf), ("ip route", route_vrf)];

impl Session {
    /// Interfaces and routes of VRFs not used in target are removed from
    /// device configuration and left untouched.
    pub(crate) fn align_vrfs(&mut self) {
        let mut b_vrf = HashSet::new();
        for (prefix, get) in VRF_USERS {
            for &c in self.b.get(prefix, "").unwrap_or_default() {
                b_vrf.insert(get(&self.b, c));
            }
        }
        // Empty target is used for testing and leaves device unchanged.
        if b_vrf.is_empty() {
            return;
        }
        let mut removed = BTreeSet::new();
        for (prefix, get) in VRF_USERS {
            let Some(l) = self.a.get(prefix, "") else {
                continue;
            };
            let mut keep = Vec::new();
            for &c in l {
                let vrf = get(&self.a, c);
                if b_vrf.contains(&vrf) {
                    keep.push(c);
                } else {
                    removed.insert(vrf);
                }
            }
            if keep.is_empty() {
                if let Some(m) = self.a.lookup.get_mut(prefix) {
                    m.remove("");
                }
            } else {
                self.a.set(prefix, "", keep);
            }
        }
        for vrf in removed {
            let vrf = if vrf.is_empty() { "<global>" } else { vrf.as_str() };
            self.note(format!("Leaving VRF {vrf} untouched"));
        }
    }

    pub(crate) fn check_interfaces(&mut self) -> Result<(), DiffError> {
        match self.model {
            Model::Ios => self.check_ios_interfaces(),
            Model::Asa => self.check_asa_interfaces(),
        }
    }

    fn check_asa_interfaces(&mut self) -> Result<(), DiffError> {
        let b_intf = implicit_interfaces(&self.b);
        // Implicit interfaces of device count when two generated
        // configurations are compared.
        let mut a_intf = implicit_interfaces(&self.a);
        let mut unknown = Vec::new();
        'intf: for &c in self.a.get("interface", "").unwrap_or_default() {
            let mut name = None;
            for &sc in &self.a.cmd(c).sub {
                let mut tokens = self.a.cmd(sc).parsed.split(' ');
                match tokens.next() {
                    Some("shutdown") => continue 'intf,
                    Some("nameif") => name = tokens.next(),
                    _ => {}
                }
            }
            if let Some(name) = name {
                a_intf.insert(name.to_string());
                if !b_intf.contains(name) {
                    unknown.push(name.to_string());
                }
            }
        }
        for name in unknown {
            self.warning(format!(
                "Interface '{name}' on device is not known by target"
            ));
        }
        match b_intf.into_iter().find(|name| !a_intf.contains(name)) {
            Some(name) => Err(DiffError::UnknownInterface { name }),
            None => Ok(()),
        }
    }

    fn check_ios_interfaces(&mut self) -> Result<(), DiffError> {
        let bl = self.b.list("interface", "");
        let mut b_intf = HashMap::new();
        for &c in &bl {
            let info = extract_intf_info(&mut self.b, c);
            b_intf.insert(intf_name(&self.b, c), info);
        }
        // Target without interfaces doesn't change any interface.
        if b_intf.is_empty() {
            return Ok(());
        }
        let mut a_known = HashSet::new();
        for c in self.a.list("interface", "") {
            let name = intf_name(&self.a, c);
            let a_info = extract_intf_info(&mut self.a, c);
            a_known.insert(name.clone());
            if a_info.shut {
                continue;
            }
            match b_intf.get(&name) {
                Some(b_info) => {
                    if a_info.addr != b_info.addr && b_info.addr != "negotiated" {
                        self.warning(format!(
                            "Different address defined for interface {name}: \
                             Device: {:?}, target: {:?}",
                            a_info.addr, b_info.addr
                        ));
                    }
                    if a_info.inspect != b_info.inspect {
                        return Err(DiffError::InterfaceMismatch {
                            name,
                            attribute: "'ip inspect'".to_string(),
                            device: a_info.inspect.to_string(),
                            target: b_info.inspect.to_string(),
                        });
                    }
                    if a_info.vrf != b_info.vrf {
                        return Err(DiffError::InterfaceMismatch {
                            name,
                            attribute: "VRFs".to_string(),
                            device: a_info.vrf,
                            target: b_info.vrf.clone(),
                        });
                    }
                }
                None if !a_info.addr.is_empty() => {
                    self.warning(format!(
                        "Interface '{name}' on device is not known by target"
                    ));
                }
                None => {}
            }
        }
        for c in bl {
            let name = intf_name(&self.b, c);
            if !a_known.contains(&name) {
                return Err(DiffError::UnknownInterface { name });
            }
        }
        Ok(())
    }

    /// Crypto maps of type gdoi and their use at interfaces are left
    /// unchanged on device.
    pub(crate) fn ignore_crypto_gdoi(&mut self) {
        let mut rm = BTreeSet::new();
        for c in self.a.list("interface", "") {
            let mut keep = Vec::new();
            for sc in self.a.cmd(c).sub.clone() {
                let cmd = self.a.cmd(sc);
                if cmd.parsed == "crypto map $REF" {
                    if let Some(r) = cmd.refs.first() {
                        let is_gdoi = self
                            .a
                            .get("crypto map", &r.name)
                            .and_then(|l| l.first())
                            .is_some_and(|&m| {
                                self.a.cmd(m).parsed == "crypto map $NAME $SEQ gdoi"
                            });
                        if is_gdoi {
                            rm.insert(r.name.clone());
                            continue;
                        }
                    }
                }
                keep.push(sc);
            }
            self.a.cmd_mut(c).sub = keep;
        }
        if let Some(m) = self.a.lookup.get_mut("crypto map") {
            for name in &rm {
                m.remove(name);
            }
        }
    }
}
