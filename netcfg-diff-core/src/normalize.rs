//! Normalization of parsed commands for comparison with device output.

use std::net::IpAddr;

use crate::config::{CmdId, Configuration, Reference};
use crate::names;
use crate::parser::ParseError;

pub(crate) fn normalize(cfg: &mut Configuration) -> Result<(), ParseError> {
    for id in top_level(cfg, "access-list") {
        normalize_asa_acl(cfg, id);
    }
    for id in top_level(cfg, "ip access-list extended") {
        for sub in cfg.cmd(id).sub.clone() {
            normalize_ios_acl(cfg, sub);
        }
    }

    // Interface bindings of crypto maps have no name of their own.
    if let Some(l) = cfg.lookup.get_mut("crypto map").and_then(|m| m.remove("")) {
        cfg.set("crypto map interface", "", l);
    }

    for prefix in ["crypto map", "crypto dynamic-map"] {
        set_transform_refs(cfg, prefix, "ikev1 transform-set");
        set_transform_refs(cfg, prefix, "ikev2 ipsec-proposal");
        // Default value 'group2' is not shown on device.
        for id in top_level(cfg, prefix) {
            let c = cfg.cmd_mut(id);
            if c.parsed.ends_with("$NAME $SEQ set pfs group2") {
                c.parsed.truncate(c.parsed.len() - " group2".len());
            }
        }
    }

    // route if_name ip_address netmask gateway_ip [metric]
    // ipv6 route if_name destination next_hop_ipv6_addr [metric]
    // Only ASA knows "route"; IOS lines have a different shape.
    let is_asa = cfg.grammar().has_prefix("route");
    for prefix in ["route", "ipv6 route"].into_iter().filter(|_| is_asa) {
        for id in top_level(cfg, prefix) {
            let c = cfg.cmd_mut(id);
            let tokens: Vec<&str> = c.parsed.split(' ').collect();
            if tokens.len() == 6 {
                c.parsed = tokens[..5].join(" ");
            }
        }
    }

    normalize_ldap_servers(cfg)?;

    // Subject name is stored in lowercase on device.
    for id in top_level(cfg, "crypto ca certificate map") {
        for sub in cfg.cmd(id).sub.clone() {
            let sc = cfg.cmd_mut(sub);
            if sc.parsed.starts_with("subject-name") {
                sc.parsed = sc.parsed.to_lowercase();
            }
        }
    }

    // Tunnel-group named by IP address of peer.
    let ip_named: Vec<CmdId> = cfg
        .lookup
        .get("tunnel-group")
        .into_iter()
        .flat_map(|m| m.iter())
        .filter(|(name, _)| name.parse::<IpAddr>().is_ok())
        .flat_map(|(_, l)| l.iter().copied())
        .collect();
    for id in ip_named {
        let c = cfg.cmd_mut(id);
        c.fixed_name = true;
        c.anchor = true;
    }
    Ok(())
}

fn top_level(cfg: &Configuration, prefix: &str) -> Vec<CmdId> {
    cfg.lookup
        .get(prefix)
        .into_iter()
        .flat_map(|m| m.values().flatten().copied())
        .collect()
}

/// `crypto map NAME SEQ set ikev1 transform-set T1 T2 ...` references
/// each transform set.
fn set_transform_refs(cfg: &mut Configuration, prefix: &str, part: &str) {
    let marker = format!(" set {part} ");
    let ref_prefix = format!("crypto ipsec {part}");
    for id in top_level(cfg, prefix) {
        let c = cfg.cmd_mut(id);
        let Some((head, names)) = c.parsed.split_once(&marker) else {
            continue;
        };
        let refs: Vec<Reference> = names
            .split_whitespace()
            .map(|n| Reference::new(ref_prefix.as_str(), n))
            .collect();
        if refs.is_empty() {
            continue;
        }
        let placeholders = vec!["$REF"; refs.len()].join(" ");
        c.parsed = format!("{head}{marker}{placeholders}");
        c.refs = refs;
    }
}

/// aaa-server NAME [(interface-name)] host {IP|NAME} [key] [timeout SECONDS]
///
/// Device shows one line per host, generated config a single host `x`.
/// All host lines are folded into one line without interface, key and
/// timeout.
fn normalize_ldap_servers(cfg: &mut Configuration) -> Result<(), ParseError> {
    let Some(m) = cfg.lookup.get("aaa-server") else {
        return Ok(());
    };
    let groups: Vec<(String, Vec<CmdId>)> = m
        .iter()
        .map(|(name, l)| (name.clone(), l.clone()))
        .collect();
    for (name, l) in groups {
        if l.len() < 2 || !cfg.cmd(l[0]).parsed.ends_with("protocol ldap") {
            continue;
        }
        let mut ldap_map: Option<String> = None;
        for &id in &l[1..] {
            let mut words: Vec<String> = cfg
                .cmd(id)
                .parsed
                .split(' ')
                .map(str::to_string)
                .collect();
            if words.get(2).is_some_and(|w| w.starts_with('(')) {
                words.remove(2);
            }
            if words.len() < 4 || words[2] != "host" {
                continue;
            }
            words[3] = "x".to_string();
            words.truncate(4);
            let attr_map = cfg
                .cmd(id)
                .sub
                .first()
                .and_then(|&s| cfg.cmd(s).refs.first())
                .map(|r| r.name.clone())
                .unwrap_or_default();
            if ldap_map.as_ref().is_some_and(|m| *m != attr_map) {
                return Err(ParseError::ConflictingAttributeMap { name });
            }
            ldap_map = Some(attr_map);
            cfg.cmd_mut(id).parsed = words.join(" ");
        }
        cfg.set("aaa-server", &name, l[..2].to_vec());
    }
    Ok(())
}

/// access-list NAME extended deny|permit PROTO SRC [PORT] DST [PORT] [log]
fn normalize_asa_acl(cfg: &mut Configuration, id: CmdId) {
    let c = cfg.cmd_mut(id);
    let mut tokens: Vec<String> = c.parsed.split_whitespace().map(str::to_string).collect();
    if tokens.get(2).map(String::as_str) != Some("extended") || tokens.len() < 5 {
        return;
    }
    let refs = AclParts::new(&mut tokens, 4, false).convert();
    c.refs.extend(refs);
    c.parsed = join_non_empty(&tokens);
}

/// [SEQ] deny|permit PROTO SRC [PORT] DST [PORT] [log]
fn normalize_ios_acl(cfg: &mut Configuration, id: CmdId) {
    let c = cfg.cmd_mut(id);
    let mut tokens: Vec<String> = c.parsed.split_whitespace().map(str::to_string).collect();
    // Sequence number shown since IOS-XE 16.12.
    if tokens.first().map(String::as_str) == Some("$SEQ") {
        tokens.remove(0);
        c.parsed = tokens.join(" ");
        if let Some((_, rest)) = c.orig.split_once(' ') {
            c.orig = rest.to_string();
        }
    }
    if tokens.len() < 2 || tokens[0] == "remark" {
        return;
    }
    let refs = AclParts::new(&mut tokens, 1, true).convert();
    c.refs.extend(refs);
    c.parsed = join_non_empty(&tokens);
}

fn join_non_empty(tokens: &[String]) -> String {
    let words: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|w| !w.is_empty())
        .collect();
    words.join(" ")
}

/// Cursor over the tokens of an access-list rule following its action.
///
/// Named ports, protocols, ICMP types and log levels are replaced by
/// numbers, object-group names by `$REF`. Cleared tokens are left empty and
/// removed when joining.
struct AclParts<'a> {
    tokens: &'a mut Vec<String>,
    pos: usize,
    proto: String,
    /// IOS uses wildcard masks instead of netmasks.
    wildcard: bool,
    refs: Vec<Reference>,
}

impl<'a> AclParts<'a> {
    fn new(tokens: &'a mut Vec<String>, pos: usize, wildcard: bool) -> Self {
        Self {
            tokens,
            pos,
            proto: String::new(),
            wildcard,
            refs: Vec::new(),
        }
    }

    fn convert(mut self) -> Vec<Reference> {
        self.conv_proto();
        self.conv_object();
        match self.proto.as_str() {
            "tcp" | "udp" => {
                self.conv_port_or_object();
                self.conv_port_or_object();
                self.conv_port_or_object();
            }
            "icmp" | "icmp6" => {
                self.conv_object();
                self.conv_icmp();
                self.skip_number();
            }
            _ => self.conv_object(),
        }
        self.conv_object();
        self.refs
    }

    fn current(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn conv_named<T: ToString>(&mut self, lookup: fn(&str) -> Option<T>) {
        if let Some(w) = self.current() {
            if let Some(num) = lookup(w) {
                self.tokens[self.pos] = num.to_string();
            }
            self.pos += 1;
        }
    }

    fn conv_named_port(&mut self) {
        match self.proto.as_str() {
            "tcp" => self.conv_named(names::tcp_port),
            "udp" => self.conv_named(names::udp_port),
            _ => {}
        }
    }

    fn conv_object_group(&mut self) {
        if let Some(name) = self.tokens.get(self.pos + 1) {
            self.refs.push(Reference::new("object-group", name.as_str()));
            self.tokens[self.pos + 1] = "$REF".to_string();
        }
        self.pos += 2;
    }

    fn conv_proto(&mut self) {
        let Some(w) = self.current() else {
            return;
        };
        match w {
            "object-group" => self.conv_object_group(),
            "object" => self.pos += 2,
            _ => {
                if let Some(name) = names::protocol_keyword(w) {
                    self.tokens[self.pos] = name.to_string();
                }
                self.proto = self.tokens[self.pos].clone();
                self.conv_named(names::protocol);
            }
        }
    }

    fn conv_object(&mut self) {
        let Some(w) = self.current() else {
            return;
        };
        match w {
            "object-group" => self.conv_object_group(),
            "log" | "log-input" => {
                self.pos += 1;
                if let Some(level) = self.current() {
                    if let Some(num) = names::log_level(level) {
                        self.tokens[self.pos] = num.to_string();
                    }
                    // Default level.
                    if self.tokens[self.pos] == "6" {
                        self.tokens[self.pos].clear();
                    }
                    self.pos += 1;
                }
                self.conv_named(names::log_level);
            }
            "host" | "object" | "object-group-security" | "object-group-user"
            | "security-group" | "user" | "user-group" => self.pos += 2,
            "any" | "any4" | "any6" | "interface" => self.pos += 1,
            _ => {
                if let Some((ip, bits)) = w.split_once('/') {
                    match bits {
                        "0" => self.tokens[self.pos] = "any6".to_string(),
                        "128" => self.tokens[self.pos] = format!("host {ip}"),
                        _ => {}
                    }
                    self.pos += 1;
                } else if let Some(mask) = self.tokens.get(self.pos + 1) {
                    let (any, host) = if self.wildcard {
                        ("255.255.255.255", "0.0.0.0")
                    } else {
                        ("0.0.0.0", "255.255.255.255")
                    };
                    if mask == any {
                        self.tokens[self.pos] = if self.wildcard { "any" } else { "any4" }.to_string();
                        self.tokens[self.pos + 1].clear();
                    } else if mask == host {
                        let ip = std::mem::replace(&mut self.tokens[self.pos], "host".to_string());
                        self.tokens[self.pos + 1] = ip;
                    }
                    self.pos += 2;
                }
            }
        }
    }

    fn conv_port_or_object(&mut self) {
        match self.current() {
            Some("eq" | "gt" | "lt" | "neq") => {
                self.pos += 1;
                self.conv_named_port();
            }
            Some("range") => {
                self.pos += 1;
                self.conv_named_port();
                self.conv_named_port();
            }
            Some(_) => self.conv_object(),
            None => {}
        }
    }

    fn conv_icmp(&mut self) {
        let Some(w) = self.current() else {
            return;
        };
        match self.proto.as_str() {
            "icmp" => {
                if let Some(code) = names::icmp_type(w) {
                    self.tokens[self.pos] = code.to_string();
                    self.pos += 1;
                }
            }
            "icmp6" => self.conv_named(names::icmp6_type),
            _ => {}
        }
    }

    fn skip_number(&mut self) {
        if self.current().is_some_and(|w| w.parse::<u8>().is_ok()) {
            self.pos += 1;
        }
    }
}
