use netcfg_diff_core::{parse, parse_config, Configuration, Model, ParseError};
use pretty_assertions::assert_eq;

fn asa(text: &str) -> Configuration {
    let grammar = Model::Asa.grammar().expect("grammar");
    parse(&grammar, text, false).expect("parse")
}

fn parsed(cfg: &Configuration, prefix: &str, name: &str) -> Vec<String> {
    cfg.get(prefix, name)
        .expect("commands")
        .iter()
        .map(|&id| cfg.cmd(id).parsed.clone())
        .collect()
}

#[test]
fn device_and_generated_acl_lines_have_equal_shape() {
    let device = asa(
        "access-list a extended permit tcp 10.1.1.0 255.255.255.0 host 10.2.2.2 eq www\n\
         access-list a extended permit udp any4 0.0.0.0 0.0.0.0 range domain 60\n\
         access-list a extended permit icmp any4 any4 echo-reply\n\
         access-list a extended permit 50 host 10.1.1.1 any4\n",
    );
    let generated = asa(
        "access-list a extended permit 6 10.1.1.0 255.255.255.0 10.2.2.2 255.255.255.255 eq 80\n\
         access-list a extended permit 17 any4 any4 range 53 60\n\
         access-list a extended permit 1 any4 any4 0\n\
         access-list a extended permit esp host 10.1.1.1 any4\n",
    );
    assert_eq!(parsed(&device, "access-list", "a"), parsed(&generated, "access-list", "a"));
}

#[test]
fn object_group_in_acl_line_is_reference() {
    let cfg = asa(
        "object-group network g\n network-object host 10.1.1.1\n\
         access-list a extended permit ip object-group g any4\n",
    );
    let id = cfg.get("access-list", "a").expect("acl")[0];
    let c = cfg.cmd(id);
    assert_eq!(c.parsed, "access-list $NAME extended permit ip object-group $REF any4");
    assert_eq!(c.refs[0].prefix, "object-group");
    assert_eq!(c.refs[0].name, "g");
    assert_eq!(cfg.printable(id), "access-list a extended permit ip object-group g any4");
}

#[test]
fn crypto_map_interface_binding_is_stored_apart() {
    let cfg = asa(
        "access-list c extended permit ip any4 any4\n\
         crypto map m 10 match address c\n\
         crypto map m 10 set pfs group2\n\
         crypto map m interface outside\n",
    );
    assert_eq!(cfg.get("crypto map interface", "").map(<[_]>::len), Some(1));
    assert_eq!(
        parsed(&cfg, "crypto map", "m"),
        vec![
            "crypto map $NAME $SEQ match address $REF",
            "crypto map $NAME $SEQ set pfs",
        ]
    );
}

#[test]
fn ios_sequence_numbers_and_wildcards_are_normalized() {
    let grammar = Model::Ios.grammar().expect("grammar");
    let cfg = parse(
        &grammar,
        "ip access-list extended a\n \
         10 permit ip 10.1.1.0 0.0.0.255 host 10.2.2.2\n \
         20 deny ip 0.0.0.0 255.255.255.255 10.3.3.3 0.0.0.0 log\n",
        false,
    )
    .expect("parse");
    let acl = cfg.get("ip access-list extended", "a").expect("acl")[0];
    let lines: Vec<(&str, &str)> = cfg
        .cmd(acl)
        .sub
        .iter()
        .map(|&id| (cfg.cmd(id).orig.as_str(), cfg.cmd(id).parsed.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            (
                "permit ip 10.1.1.0 0.0.0.255 host 10.2.2.2",
                "permit ip 10.1.1.0 0.0.0.255 host 10.2.2.2"
            ),
            (
                "deny ip 0.0.0.0 255.255.255.255 10.3.3.3 0.0.0.0 log",
                "deny ip any host 10.3.3.3 log"
            ),
        ]
    );
}

#[test]
fn raw_file_is_detected_by_extension() {
    let grammar = Model::Asa.grammar().expect("grammar");
    let cfg = parse_config(&grammar, b"route inside 10.0.0.0 255.0.0.0 10.1.1.1\n", "fw1.raw")
        .expect("parse");
    assert!(cfg.is_raw());
    let err = parse_config(&grammar, b"hostname fw1\n", "fw1.raw").unwrap_err();
    assert_eq!(
        err,
        ParseError::UnexpectedCommand {
            line: "hostname fw1".to_string()
        }
    );
    let cfg = parse_config(&grammar, b"hostname fw1\n", "fw1").expect("parse");
    assert!(cfg.is_empty());
}
