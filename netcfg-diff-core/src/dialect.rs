//! Built-in grammars of supported device families.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::grammar::{Grammar, GrammarError};

/// Command descriptions of Cisco ASA.
///
/// - `$NAME` matches name of command; only used in toplevel commands.
/// - `$SEQ` matches a sequence number.
/// - `*` matches one or more words at end of command.
/// - `"` matches a string in double quotes or a single word.
/// - `$<prefix>` references a command with this prefix.
///
/// First word is used as prefix, `_` standing for space.
pub const ASA_GRAMMAR: &str = r#"
[CLEAR_CONF]
# * may reference multiple $object-group, resolved during normalization.
access-list $NAME standard *
access-list $NAME extended *
access-list $NAME remark *

object-group network $NAME
 *
object-group service $NAME *
 *
object-group service $NAME
 *
object-group protocol $NAME
 *
[FIXED_NAME]
crypto_map $NAME $SEQ match address $access-list
crypto_map $NAME $SEQ ipsec-isakmp dynamic $crypto_dynamic-map
# * references one or more $crypto_ipsec_ikev1_transform-set
crypto_map $NAME $SEQ set ikev1 transform-set *
# * references one or more $crypto_ipsec_ikev2_ipsec-proposal
crypto_map $NAME $SEQ set ikev2 ipsec-proposal *
crypto_map $NAME $SEQ set nat-t-disable
crypto_map $NAME $SEQ set peer *
crypto_map $NAME $SEQ set pfs *
crypto_map $NAME $SEQ set pfs
crypto_map $NAME $SEQ set reverse-route
crypto_map $NAME $SEQ set security-association lifetime *
crypto_map $NAME $SEQ set trustpoint *
crypto_dynamic-map $NAME $SEQ match address $access-list
crypto_dynamic-map $NAME $SEQ ipsec-isakmp dynamic *
crypto_dynamic-map $NAME $SEQ set ikev1 transform-set *
crypto_dynamic-map $NAME $SEQ set ikev2 ipsec-proposal *
crypto_dynamic-map $NAME $SEQ set nat-t-disable
crypto_dynamic-map $NAME $SEQ set peer *
crypto_dynamic-map $NAME $SEQ set pfs *
# Default value 'group2' is not shown in config from device.
crypto_dynamic-map $NAME $SEQ set pfs
crypto_dynamic-map $NAME $SEQ set reverse-route
crypto_dynamic-map $NAME $SEQ set security-association lifetime *
[CLEAR_CONF]
group-policy $NAME internal
group-policy $NAME attributes
 vpn-filter value $access-list
 split-tunnel-network-list value $access-list
 address-pools value $ip_local_pool
 !webvpn
 *

[SIMPLE_OBJ]
ip_local_pool $NAME *
crypto_ipsec_ikev1_transform-set $NAME *
crypto_ipsec_ikev2_ipsec-proposal $NAME
 protocol esp encryption *
 protocol esp integrity *

[FIXED_NAME]
# Transferred manually, but references must be followed.
aaa-server $NAME protocol ldap
# Host differs between generated config and device:
# Device:    aaa-server NAME (inside) host 1.2.3.4
# Generated: aaa-server NAME host X
aaa-server $NAME *
 ldap-attribute-map $ldap_attribute-map
ldap_attribute-map $NAME
 map-name memberOf Group-Policy
 map-value memberOf " $group-policy

[CLEAR_CONF]
crypto_ca_certificate_map $NAME $SEQ
 subject-name *
 extended-key-usage *
# Anchor with fixed name if $NAME is IP address.
tunnel-group $NAME type *
tunnel-group $NAME general-attributes
 default-group-policy $group-policy
 authentication-server-group $aaa-server
 *
tunnel-group $NAME ipsec-attributes
 !ikev1 pre-shared-key *
 !ikev2 local-authentication pre-shared-key *
 !ikev2 remote-authentication pre-shared-key *
 !isakmp keepalive *
 *
tunnel-group $NAME webvpn-attributes
 *

[ANCHOR]
access-group $access-list global
access-group $access-list in *
access-group $access-list out *
tunnel-group-map default-group $tunnel-group
tunnel-group-map $crypto_ca_certificate_map $SEQ $tunnel-group
webvpn
 certificate-group-map $crypto_ca_certificate_map $SEQ $tunnel-group
[ANCHOR,FIXED_NAME]
# Stored with prefix "crypto map interface".
crypto_map $crypto_map interface *
[ANCHOR,CLEAR_CONF,FIXED_NAME]
username $NAME nopassword
username $NAME attributes
 vpn-filter value $access-list
 vpn-group-policy $group-policy
 *
[ANCHOR]
# Anchors not referencing any command.
route *
ipv6_route *
interface *
 shutdown
 nameif *
no_sysopt_connection_permit-vpn
"#;

/// Command descriptions of Cisco IOS, same notation as [`ASA_GRAMMAR`].
pub const IOS_GRAMMAR: &str = r#"
[ANCHOR]
ip_route *
ipv6_route *
interface *
 ip address *
 ip unnumbered *
 shutdown
 ip access-group $ip_access-list_extended in
 ip access-group $ip_access-list_extended out
 ip inspect *
 # 'vrf forwarding' is used if IPv6 is enabled.
 vrf forwarding *
 ip vrf forwarding *
 crypto map $crypto_map

ip_access-list_extended $NAME
 remark *
 permit *
 deny *
 $SEQ remark *
 $SEQ permit *
 $SEQ deny *

crypto_map $NAME $SEQ ipsec-isakmp
 set ip access-group $ip_access-list_extended in
 set ip access-group $ip_access-list_extended out
 set peer *
crypto_map $NAME $SEQ gdoi
"#;

/// Supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Model {
    Asa,
    Ios,
}

impl Model {
    /// Grammar text of this family.
    pub fn grammar_text(self) -> &'static str {
        match self {
            Model::Asa => ASA_GRAMMAR,
            Model::Ios => IOS_GRAMMAR,
        }
    }

    /// Compiled grammar, built on first use and shared afterwards.
    pub fn grammar(self) -> Result<Arc<Grammar>, GrammarError> {
        static ASA: OnceLock<Result<Arc<Grammar>, GrammarError>> = OnceLock::new();
        static IOS: OnceLock<Result<Arc<Grammar>, GrammarError>> = OnceLock::new();
        let cell = match self {
            Model::Asa => &ASA,
            Model::Ios => &IOS,
        };
        cell.get_or_init(|| Grammar::compile(self.grammar_text()).map(Arc::new))
            .clone()
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Model::Asa => f.write_str("ASA"),
            Model::Ios => f.write_str("IOS"),
        }
    }
}

/// Model name not known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device model {0:?}, expected ASA or IOS")]
pub struct UnknownModel(pub String);

impl FromStr for Model {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASA" => Ok(Model::Asa),
            "IOS" => Ok(Model::Ios),
            _ => Err(UnknownModel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Model, UnknownModel, ASA_GRAMMAR, IOS_GRAMMAR};
    use crate::grammar::Grammar;

    #[test]
    fn built_in_grammars_compile() {
        Grammar::compile(ASA_GRAMMAR).expect("ASA grammar");
        Grammar::compile(IOS_GRAMMAR).expect("IOS grammar");
        let asa = Model::Asa.grammar().expect("ASA");
        assert!(asa.has_prefix("crypto ipsec ikev1 transform-set"));
        assert!(asa.has_prefix("no sysopt connection permit-vpn"));
        let ios = Model::Ios.grammar().expect("IOS");
        assert!(ios.has_prefix("ip access-list extended"));
        assert!(!ios.has_prefix("tunnel-group"));
    }

    #[test]
    fn model_names() {
        assert_eq!("asa".parse::<Model>(), Ok(Model::Asa));
        assert_eq!("IOS".parse::<Model>(), Ok(Model::Ios));
        assert_eq!(
            "nxos".parse::<Model>(),
            Err(UnknownModel("nxos".to_string()))
        );
        assert_eq!(Model::Ios.to_string(), "IOS");
    }
}
