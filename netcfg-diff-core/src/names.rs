//! Symbolic names used in access-list lines and their numeric values.

/// IP protocol names without special meaning in access-list lines.
pub(crate) fn protocol(name: &str) -> Option<u16> {
    let num = match name {
        "ah" | "ahp" => 51,
        "eigrp" => 88,
        "esp" | "ipsec" => 50,
        "gre" | "pptp" => 47,
        "igmp" => 2,
        "igrp" => 9,
        "ipinip" => 4,
        "nos" => 94,
        "ospf" => 89,
        "pcp" => 108,
        "pim" => 103,
        "sctp" => 132,
        "snp" => 109,
        _ => return None,
    };
    Some(num)
}

/// Numeric protocols that are shown by name on device.
pub(crate) fn protocol_keyword(num: &str) -> Option<&'static str> {
    match num {
        "1" => Some("icmp"),
        "6" => Some("tcp"),
        "17" => Some("udp"),
        "58" => Some("icmp6"),
        _ => None,
    }
}

pub(crate) fn tcp_port(name: &str) -> Option<u16> {
    let num = match name {
        "aol" => 5190,
        "bgp" => 179,
        "chargen" => 19,
        "cifs" => 3020,
        "citrix-ica" => 1494,
        "cmd" | "rsh" => 514,
        "connectedapps-plain" => 15001,
        "connectedapps-tls" => 15002,
        "ctiqbe" => 2748,
        "daytime" => 13,
        "discard" => 9,
        "domain" => 53,
        "echo" => 7,
        "exec" => 512,
        "finger" => 79,
        "ftp" => 21,
        "ftp-data" => 20,
        "gopher" => 70,
        "h323" => 1720,
        "hostname" => 101,
        "http" | "www" => 80,
        "https" => 443,
        "ident" => 113,
        "imap4" => 143,
        "irc" => 194,
        "kerberos" => 750,
        "klogin" => 543,
        "kshell" => 544,
        "ldap" => 389,
        "ldaps" => 636,
        "login" => 513,
        "lotusnotes" => 1352,
        "lpd" => 515,
        "msrpc" => 135,
        "netbios-ssn" => 139,
        "nfs" => 2049,
        "nntp" => 119,
        "pcanywhere-data" => 5631,
        "pim-auto-rp" => 496,
        "pop2" => 109,
        "pop3" => 110,
        "pptp" => 1723,
        "rtsp" => 554,
        "sip" => 5060,
        "smtp" => 25,
        "sqlnet" => 1521,
        "ssh" => 22,
        "sunrpc" => 111,
        "tacacs" => 49,
        "tacacs-ds" => 65,
        "talk" => 517,
        "telnet" => 23,
        "uucp" => 540,
        "whois" => 43,
        _ => return None,
    };
    Some(num)
}

pub(crate) fn udp_port(name: &str) -> Option<u16> {
    let num = match name {
        "biff" => 512,
        "bootpc" => 68,
        "bootps" => 67,
        "cifs" => 3020,
        "discard" => 9,
        "dns" | "domain" => 53,
        "dnsix" => 195,
        "echo" => 7,
        "http" | "www" => 80,
        "isakmp" => 500,
        "kerberos" => 750,
        "mobile-ip" => 434,
        "nameserver" => 42,
        "netbios-dgm" => 138,
        "netbios-ns" => 137,
        "netbios-ss" => 139,
        "nfs" => 2049,
        "non500-isakmp" => 4500,
        "ntp" => 123,
        "pcanywhere-status" => 5632,
        "pim-auto-rp" => 496,
        "radius" => 1645,
        "radius-acct" => 1646,
        "rip" => 520,
        "ripng" | "ripv6" => 521,
        "secureid-udp" => 5510,
        "sip" => 5060,
        "snmp" => 161,
        "snmptrap" => 162,
        "sunrpc" => 111,
        "syslog" => 514,
        "tacacs" => 49,
        "tacacs-ds" => 65,
        "talk" => 517,
        "tftp" => 69,
        "time" => 37,
        "vxlan" => 4789,
        "who" => 513,
        "xdmcp" => 177,
        _ => return None,
    };
    Some(num)
}

/// ICMP type name to "type" or "type code".
pub(crate) fn icmp_type(name: &str) -> Option<&'static str> {
    let code = match name {
        "administratively-prohibited" => "3 13",
        "alternate-address" => "6",
        "conversion-error" => "31",
        "dod-host-prohibited" => "3 10",
        "dod-net-prohibited" => "3 9",
        "echo" => "8",
        "echo-reply" => "0",
        "general-parameter-problem" => "12 0",
        "host-isolated" => "3 8",
        "host-precedence-unreachable" => "3 14",
        "host-redirect" => "5 1",
        "host-tos-redirect" => "5 3",
        "host-tos-unreachable" => "3 12",
        "host-unknown" => "3 7",
        "host-unreachable" => "3 1",
        "information-reply" => "16",
        "information-request" => "15",
        "mask-reply" => "18",
        "mask-request" => "17",
        "mobile-redirect" => "32",
        "net-redirect" => "5 0",
        "net-tos-redirect" => "5 2",
        "net-tos-unreachable" => "3 11",
        "net-unreachable" => "3 0",
        "network-unknown" => "3 6",
        "no-room-for-option" => "12 2",
        "option-missing" => "12 1",
        "packet-too-big" => "3 4",
        "parameter-problem" => "12",
        "port-unreachable" => "3 3",
        "precedence-unreachable" => "3 15",
        "protocol-unreachable" => "3 2",
        "reassembly-timeout" => "11",
        "redirect" => "5",
        "router-advertisement" => "9",
        "router-solicitation" => "10",
        "source-quench" => "4",
        "source-route-failed" => "3 5",
        "time-exceeded" => "11",
        "timestamp-reply" => "14",
        "timestamp-request" => "13",
        "traceroute" => "30",
        "ttl-exceeded" => "11 0",
        "unreachable" => "3",
        _ => return None,
    };
    Some(code)
}

pub(crate) fn icmp6_type(name: &str) -> Option<u16> {
    let num = match name {
        "echo" => 128,
        "echo-reply" => 129,
        "membership-query" => 130,
        "membership-reduction" => 132,
        "membership-report" => 131,
        "neighbor-advertisement" => 136,
        "neighbor-redirect" => 137,
        "neighbor-solicitation" => 135,
        "packet-too-big" => 2,
        "parameter-problem" => 4,
        "router-advertisement" => 134,
        "router-renumbering" => 138,
        "router-solicitation" => 133,
        "time-exceeded" => 3,
        "unreachable" => 1,
        _ => return None,
    };
    Some(num)
}

/// Syslog level names.
pub(crate) fn log_level(name: &str) -> Option<u16> {
    let num = match name {
        "emergencies" => 0,
        "alerts" => 1,
        "critical" => 2,
        "errors" => 3,
        "warnings" => 4,
        "notifications" => 5,
        "informational" => 6,
        "debugging" => 7,
        _ => return None,
    };
    Some(num)
}
