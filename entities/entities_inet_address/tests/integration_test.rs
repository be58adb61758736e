//! Integration tests for entities_inet_address crate
//!
//! These tests drive the public address API end to end with an in-memory resolver.

use entities_inet_address::*;
use std::cell::Cell;
use std::collections::HashMap;

/// Table-driven resolver that counts how often it is consulted
#[derive(Default)]
struct TableResolver {
    forward: HashMap<(String, AddressFamily), Vec<RawAddress>>,
    reverse: HashMap<RawAddress, String>,
    forward_calls: Cell<usize>,
    reverse_calls: Cell<usize>,
}

impl TableResolver {
    fn with_host(mut self, host: &str, family: AddressFamily, raws: Vec<RawAddress>) -> Self {
        self.forward.insert((host.to_string(), family), raws);
        self
    }

    fn with_name(mut self, raw: RawAddress, name: &str) -> Self {
        self.reverse.insert(raw, name.to_string());
        self
    }
}

impl Resolver for TableResolver {
    fn lookup_host(&self, host: &str, family: AddressFamily) -> Result<Vec<RawAddress>, ResolveError> {
        self.forward_calls.set(self.forward_calls.get() + 1);
        self.forward
            .get(&(host.to_string(), family))
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(host.to_string()))
    }

    fn reverse_lookup(&self, address: &RawAddress) -> Result<String, ResolveError> {
        self.reverse_calls.set(self.reverse_calls.get() + 1);
        self.reverse
            .get(address)
            .cloned()
            .ok_or_else(|| ResolveError::Failed("no PTR record".to_string()))
    }
}

#[test]
fn test_literal_resolution_never_queries() {
    let resolver = TableResolver::default();
    let all = resolve_all("127.0.0.1", FamilyMask::ANY, &resolver).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].octets(), &[0x7F, 0x00, 0x00, 0x01]);
    assert_eq!(resolver.forward_calls.get(), 0);
}

#[test]
fn test_nonexistent_host() {
    let resolver = TableResolver::default();
    let err = resolve_all("nonexistent.invalid.tld", FamilyMask::ANY, &resolver).unwrap_err();
    assert_eq!(err, AddressError::UnknownHost("nonexistent.invalid.tld".to_string()));
    assert_eq!(resolver.forward_calls.get(), 2);
}

#[test]
fn test_dual_stack_resolution_then_classification() {
    let mut link_local = [0u8; 16];
    link_local[0] = 0xFE;
    link_local[1] = 0x80;
    link_local[15] = 0x07;

    let resolver = TableResolver::default()
        .with_host("printer.lan", AddressFamily::Ipv4, vec![RawAddress::V4([192, 168, 4, 7])])
        .with_host("printer.lan", AddressFamily::Ipv6, vec![RawAddress::V6(link_local)]);

    let all = resolve_all("printer.lan", FamilyMask::ANY, &resolver).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].is_site_local_address());
    assert!(all[1].is_link_local_address());
    assert_eq!(all[0].host_name(&resolver), "printer.lan");
    assert_eq!(resolver.reverse_calls.get(), 0);

    let first = resolve_one("printer.lan", FamilyMask::IPV6, &resolver).unwrap();
    assert_eq!(first.family(), AddressFamily::Ipv6);
}

#[test]
fn test_lazy_reverse_lookup() {
    let known = RawAddress::V4([10, 0, 0, 53]);
    let resolver = TableResolver::default().with_name(known, "ns.corp");

    let named = InetAddress::from_raw(known);
    assert_eq!(named.host_name(&resolver), "ns.corp");
    assert_eq!(named.host_name(&resolver), "ns.corp");

    let anonymous = InetAddress::parse("10.0.0.54").unwrap();
    assert_eq!(anonymous.host_name(&resolver), "10.0.0.54");
    assert_eq!(anonymous.host_name(&resolver), "10.0.0.54");

    assert_eq!(resolver.reverse_calls.get(), 2);
}

#[test]
fn test_raw_byte_round_trip() {
    let v6 = [
        0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xbe, 0xef,
    ];
    let address = InetAddress::from_bytes(&v6, None).unwrap();
    assert_eq!(address.octets(), &v6);
    assert_eq!(address.host_address(), "2001:db8::beef");

    assert_eq!(
        InetAddress::from_bytes(&[1, 2, 3], None).unwrap_err(),
        AddressError::InvalidAddressLength(3)
    );
    assert_eq!(
        InetAddress::from_bytes(&[0; 17], None).unwrap_err(),
        AddressError::InvalidAddressLength(17)
    );
}

#[test]
fn test_multicast_edges_through_public_api() {
    let link = InetAddress::parse("224.0.0.1").unwrap();
    assert!(link.is_multicast_address());
    assert!(link.is_mc_link_local());
    assert!(!link.is_mc_global());

    let global = InetAddress::parse("224.0.1.0").unwrap();
    assert!(global.is_mc_global());

    let gap = InetAddress::parse("239.0.0.0").unwrap();
    assert!(AddressClasses::of(gap.raw()).is_unclassified());

    let org = InetAddress::parse("ff08::1").unwrap();
    assert!(org.is_mc_org_local());
}
