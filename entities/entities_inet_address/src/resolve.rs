//! Resolution Module
//!
//! The hostname resolver is an external collaborator. This module only defines the
//! contract it has to satisfy ([`Resolver`]) and the rules layered on top of it:
//! literal short-circuiting, family selection, ordering and de-duplication.

use std::collections::HashSet;
use std::ops::BitOr;

use thiserror::Error;
use tracing::{debug, trace};

use crate::address::{AddressError, AddressFamily, InetAddress, RawAddress};

/// Resolver collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The name does not exist for the queried family
    #[error("no such host: {0}")]
    NotFound(String),
    /// The lookup itself failed (resolver unreachable, bad input, ...)
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// Hostname resolver contract
///
/// Forward lookups return addresses in the order the resolver prefers them. Reverse
/// lookups are best effort; callers fall back to the textual address when they fail.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver {
    /// Forward lookup of `host`, restricted to one address family
    fn lookup_host(&self, host: &str, family: AddressFamily) -> Result<Vec<RawAddress>, ResolveError>;

    /// Reverse lookup of a raw address
    fn reverse_lookup(&self, address: &RawAddress) -> Result<String, ResolveError>;
}

/// Set of address families a lookup may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FamilyMask(u8);

impl FamilyMask {
    /// IPv4 results only
    pub const IPV4: Self = Self(1 << 0);
    /// IPv6 results only
    pub const IPV6: Self = Self(1 << 1);
    /// IPv4 followed by IPv6 results
    pub const ANY: Self = Self(Self::IPV4.0 | Self::IPV6.0);

    /// Mask selecting nothing
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected families in lookup order: IPv4 before IPv6
    pub fn families(self) -> impl Iterator<Item = AddressFamily> {
        [
            (Self::IPV4, AddressFamily::Ipv4),
            (Self::IPV6, AddressFamily::Ipv6),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, family)| family)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl Default for FamilyMask {
    fn default() -> Self {
        Self::ANY
    }
}

impl BitOr for FamilyMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl From<AddressFamily> for FamilyMask {
    fn from(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => Self::IPV4,
            AddressFamily::Ipv6 => Self::IPV6,
        }
    }
}

/// Resolve `host` to every address of the requested families
///
/// # Arguments
///
/// * `host` - Hostname or IPv4/IPv6 literal
/// * `mask` - Families to query
/// * `resolver` - Lookup collaborator; not consulted at all for literals
///
/// # Returns
///
/// * `Ok(Vec<InetAddress>)` - IPv4 results (if requested) then IPv6 results (if requested),
///   each in resolver order, duplicates removed; every address carries `host` as hostname
/// * `Err(AddressError::UnknownHost)` - No family produced an address
pub fn resolve_all(
    host: &str,
    mask: FamilyMask,
    resolver: &dyn Resolver,
) -> Result<Vec<InetAddress>, AddressError> {
    if let Ok(literal) = InetAddress::parse(host) {
        trace!(host, "literal address, resolver skipped");
        return Ok(vec![literal]);
    }

    let mut seen = HashSet::new();
    let mut addresses = Vec::new();
    for family in mask.families() {
        let raws = match resolver.lookup_host(host, family) {
            Ok(raws) => raws,
            Err(err) => {
                debug!(host, ?family, error = %err, "lookup returned no addresses");
                continue;
            }
        };
        for raw in raws {
            if raw.family() != family {
                continue;
            }
            if seen.insert(raw) {
                addresses.push(InetAddress::with_hostname(raw, host));
            }
        }
    }

    if addresses.is_empty() {
        return Err(AddressError::UnknownHost(host.to_string()));
    }
    debug!(host, count = addresses.len(), "resolved");
    Ok(addresses)
}

/// First address [`resolve_all`] would return
pub fn resolve_one(
    host: &str,
    mask: FamilyMask,
    resolver: &dyn Resolver,
) -> Result<InetAddress, AddressError> {
    resolve_all(host, mask, resolver)?
        .into_iter()
        .next()
        .ok_or_else(|| AddressError::UnknownHost(host.to_string()))
}
