//! Classification Module
//!
//! Address-class predicates (RFC 1918, RFC 3171, RFC 4291). Each predicate is a pure
//! function of the raw bytes and dispatches on the family tag.
//!
//! IPv4 has no node-local multicast scope, so [`is_mc_node_local`] is always false for it.
//! The IPv4 global multicast range is `224.0.0.0`-`238.255.255.255` minus exactly the
//! `224.0.0.x` block, which is the link-local multicast block.

use crate::address::RawAddress;

const IPV6_MULTICAST: u8 = 0xFF;
const IPV6_SCOPE_NODE: u8 = 0x01;
const IPV6_SCOPE_LINK: u8 = 0x02;
const IPV6_SCOPE_SITE: u8 = 0x05;
const IPV6_SCOPE_ORG: u8 = 0x08;
const IPV6_SCOPE_GLOBAL: u8 = 0x0E;

/// Wildcard address: every byte zero
pub fn is_any_local(raw: &RawAddress) -> bool {
    raw.as_bytes().iter().all(|&b| b == 0)
}

/// Loopback: `127.0.0.0/8` or exactly `::1`
pub fn is_loopback(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => b[0] == 127,
        RawAddress::V6(b) => b[..15].iter().all(|&x| x == 0) && b[15] == 1,
    }
}

/// Link-local unicast (`169.254.0.0/16` or `fe80::/10`)
pub fn is_link_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => b[0] == 169 && b[1] == 254,
        RawAddress::V6(b) => b[0] == 0xFE && (b[1] & 0xC0) == 0x80,
    }
}

/// Private-range address. For IPv4 only `172.16.x.x` of the 172 block counts.
pub fn is_site_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => {
            b[0] == 10 || (b[0] == 172 && b[1] == 16) || (b[0] == 192 && b[1] == 168)
        }
        RawAddress::V6(b) => b[0] == 0xFE && (b[1] & 0xC0) == 0xC0,
    }
}

/// Any multicast group address (`224.0.0.0/4` or `ff00::/8`)
pub fn is_multicast(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => (b[0] & 0xF0) == 0xE0,
        RawAddress::V6(b) => b[0] == IPV6_MULTICAST,
    }
}

/// Globally scoped multicast. For IPv4, `224.0.1.0` through `238.255.255.255`.
pub fn is_mc_global(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => {
            (224..=238).contains(&b[0]) && !(b[0] == 224 && b[1] == 0 && b[2] == 0)
        }
        RawAddress::V6(b) => ipv6_mc_scope(b) == Some(IPV6_SCOPE_GLOBAL),
    }
}

/// Interface-local multicast (`ff?1::`); never true for IPv4
pub fn is_mc_node_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(_) => false,
        RawAddress::V6(b) => ipv6_mc_scope(b) == Some(IPV6_SCOPE_NODE),
    }
}

/// Link-scoped multicast (`224.0.0.0/24` or `ff?2::`)
pub fn is_mc_link_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => b[0] == 224 && b[1] == 0 && b[2] == 0,
        RawAddress::V6(b) => ipv6_mc_scope(b) == Some(IPV6_SCOPE_LINK),
    }
}

/// Site-scoped multicast (`239.255.0.0/16` or `ff?5::`)
pub fn is_mc_site_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => b[0] == 239 && b[1] == 255,
        RawAddress::V6(b) => ipv6_mc_scope(b) == Some(IPV6_SCOPE_SITE),
    }
}

/// Organization-scoped multicast (`239.192.0.0/14` or `ff?8::`)
pub fn is_mc_org_local(raw: &RawAddress) -> bool {
    match raw {
        RawAddress::V4(b) => b[0] == 239 && (192..=195).contains(&b[1]),
        RawAddress::V6(b) => ipv6_mc_scope(b) == Some(IPV6_SCOPE_ORG),
    }
}

// Scope nibble of an ff00::/8 address.
fn ipv6_mc_scope(b: &[u8; 16]) -> Option<u8> {
    (b[0] == IPV6_MULTICAST).then_some(b[1] & 0x0F)
}

/// Every class predicate evaluated at once
///
/// Handy when a caller wants to know which classes an address falls into (or that it falls
/// into none). The umbrella [`is_multicast`] check is left out so that "exactly one scope"
/// assertions stay meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressClasses {
    pub any_local: bool,
    pub loopback: bool,
    pub link_local: bool,
    pub site_local: bool,
    pub mc_global: bool,
    pub mc_node_local: bool,
    pub mc_link_local: bool,
    pub mc_site_local: bool,
    pub mc_org_local: bool,
}

impl AddressClasses {
    /// Evaluate every predicate against `raw`
    pub fn of(raw: &RawAddress) -> Self {
        Self {
            any_local: is_any_local(raw),
            loopback: is_loopback(raw),
            link_local: is_link_local(raw),
            site_local: is_site_local(raw),
            mc_global: is_mc_global(raw),
            mc_node_local: is_mc_node_local(raw),
            mc_link_local: is_mc_link_local(raw),
            mc_site_local: is_mc_site_local(raw),
            mc_org_local: is_mc_org_local(raw),
        }
    }

    /// True when no predicate matched
    pub fn is_unclassified(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> RawAddress {
        RawAddress::V4([a, b, c, d])
    }

    fn v6_prefix(b0: u8, b1: u8) -> RawAddress {
        let mut bytes = [0u8; 16];
        bytes[0] = b0;
        bytes[1] = b1;
        bytes[15] = 0x01;
        RawAddress::V6(bytes)
    }

    #[test]
    fn test_ipv4_boundaries() {
        assert!(AddressClasses::of(&v4(223, 255, 255, 255)).is_unclassified());
        assert!(AddressClasses::of(&v4(239, 0, 0, 0)).is_unclassified());

        assert_eq!(
            AddressClasses::of(&v4(224, 0, 0, 0)),
            AddressClasses { mc_link_local: true, ..Default::default() }
        );
        assert_eq!(
            AddressClasses::of(&v4(224, 0, 1, 0)),
            AddressClasses { mc_global: true, ..Default::default() }
        );
        assert_eq!(
            AddressClasses::of(&v4(238, 255, 255, 255)),
            AddressClasses { mc_global: true, ..Default::default() }
        );
        assert_eq!(
            AddressClasses::of(&v4(0, 0, 0, 0)),
            AddressClasses { any_local: true, ..Default::default() }
        );
    }

    #[test]
    fn test_ipv4_private_ranges() {
        assert!(is_site_local(&v4(10, 200, 3, 4)));
        assert!(is_site_local(&v4(172, 16, 0, 1)));
        assert!(!is_site_local(&v4(172, 17, 0, 1)));
        assert!(is_site_local(&v4(192, 168, 255, 1)));
        assert!(!is_site_local(&v4(192, 169, 0, 1)));
        assert!(is_link_local(&v4(169, 254, 10, 10)));
        assert!(!is_link_local(&v4(169, 253, 10, 10)));
    }

    #[test]
    fn test_ipv4_admin_scoped_multicast() {
        assert!(is_mc_site_local(&v4(239, 255, 0, 1)));
        assert!(is_mc_org_local(&v4(239, 192, 0, 1)));
        assert!(is_mc_org_local(&v4(239, 195, 255, 255)));
        assert!(!is_mc_org_local(&v4(239, 196, 0, 0)));
        assert!(!is_mc_node_local(&v4(224, 0, 0, 1)));
    }

    #[test]
    fn test_ipv6_specials() {
        let unspecified = RawAddress::V6([0u8; 16]);
        assert_eq!(
            AddressClasses::of(&unspecified),
            AddressClasses { any_local: true, ..Default::default() }
        );

        let mut one = [0u8; 16];
        one[15] = 1;
        assert_eq!(
            AddressClasses::of(&RawAddress::V6(one)),
            AddressClasses { loopback: true, ..Default::default() }
        );
    }

    #[test]
    fn test_ipv6_unicast_scopes() {
        assert!(is_link_local(&v6_prefix(0xFE, 0x80)));
        assert!(is_link_local(&v6_prefix(0xFE, 0xBF)));
        assert!(!is_link_local(&v6_prefix(0xFE, 0xC0)));
        assert!(is_site_local(&v6_prefix(0xFE, 0xC0)));
        assert!(is_site_local(&v6_prefix(0xFE, 0xFF)));
        assert!(!is_site_local(&v6_prefix(0xFD, 0xC0)));
    }

    #[test]
    fn test_ipv6_multicast_scopes() {
        assert!(is_mc_node_local(&v6_prefix(0xFF, 0x01)));
        assert!(is_mc_link_local(&v6_prefix(0xFF, 0x02)));
        assert!(is_mc_site_local(&v6_prefix(0xFF, 0x05)));
        assert!(is_mc_org_local(&v6_prefix(0xFF, 0x08)));
        assert!(is_mc_global(&v6_prefix(0xFF, 0x0E)));
        // flag nibble is ignored
        assert!(is_mc_global(&v6_prefix(0xFF, 0x1E)));
        assert!(AddressClasses::of(&v6_prefix(0xFF, 0x03)).is_unclassified());
        assert!(is_multicast(&v6_prefix(0xFF, 0x03)));
    }

    proptest! {
        #[test]
        fn prop_ipv4_table(a in any::<u8>(), b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
            let raw = v4(a, b, c, d);
            let classes = AddressClasses::of(&raw);
            prop_assert_eq!(classes.any_local, a == 0 && b == 0 && c == 0 && d == 0);
            prop_assert_eq!(classes.loopback, a == 127);
            prop_assert_eq!(classes.link_local, a == 169 && b == 254);
            prop_assert_eq!(
                classes.site_local,
                a == 10 || (a == 172 && b == 16) || (a == 192 && b == 168)
            );
            prop_assert_eq!(
                classes.mc_global,
                (224..=238).contains(&a) && !(a == 224 && b == 0 && c == 0)
            );
            prop_assert!(!classes.mc_node_local);
            prop_assert_eq!(classes.mc_link_local, a == 224 && b == 0 && c == 0);
            prop_assert_eq!(classes.mc_site_local, a == 239 && b == 255);
            prop_assert_eq!(classes.mc_org_local, a == 239 && (192..=195).contains(&b));
        }

        #[test]
        fn prop_ipv4_multicast_block_edges(
            a in prop::sample::select(vec![223u8, 224, 238, 239, 240]),
            b in prop::sample::select(vec![0u8, 1, 191, 192, 195, 196, 254, 255]),
            c in prop::sample::select(vec![0u8, 1, 255])
        ) {
            let classes = AddressClasses::of(&v4(a, b, c, 0));
            let scoped = [
                classes.mc_global,
                classes.mc_link_local,
                classes.mc_site_local,
                classes.mc_org_local,
            ];
            // at most one multicast scope ever applies
            prop_assert!(scoped.iter().filter(|&&hit| hit).count() <= 1);
            if a == 223 || a == 240 {
                prop_assert!(classes.is_unclassified());
            }
        }

        #[test]
        fn prop_ipv6_table(bytes in prop::array::uniform16(any::<u8>())) {
            let raw = RawAddress::V6(bytes);
            let classes = AddressClasses::of(&raw);
            let scope = bytes[1] & 0x0F;
            let mc = bytes[0] == 0xFF;
            prop_assert_eq!(classes.any_local, bytes.iter().all(|&x| x == 0));
            prop_assert_eq!(
                classes.loopback,
                bytes[..15].iter().all(|&x| x == 0) && bytes[15] == 1
            );
            prop_assert_eq!(classes.link_local, bytes[0] == 0xFE && (bytes[1] & 0xC0) == 0x80);
            prop_assert_eq!(classes.site_local, bytes[0] == 0xFE && (bytes[1] & 0xC0) == 0xC0);
            prop_assert_eq!(classes.mc_global, mc && scope == 14);
            prop_assert_eq!(classes.mc_node_local, mc && scope == 1);
            prop_assert_eq!(classes.mc_link_local, mc && scope == 2);
            prop_assert_eq!(classes.mc_site_local, mc && scope == 5);
            prop_assert_eq!(classes.mc_org_local, mc && scope == 8);
        }
    }
}
