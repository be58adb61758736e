//! Address Module
//!
//! Binary address values. The raw byte length decides the family: 4 bytes is IPv4,
//! 16 bytes is IPv6, anything else is rejected at construction.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::warn;

use crate::classify;
use crate::resolve::Resolver;

/// Address construction and lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Raw bytes were neither 4 nor 16 long
    #[error("invalid address length: {0} bytes (expected 4 or 16)")]
    InvalidAddressLength(usize),
    /// The resolver produced no usable address for the requested families
    #[error("unknown host: {0}")]
    UnknownHost(String),
    /// Text was not an IPv4 or IPv6 literal
    #[error("not an IP address literal: {0}")]
    InvalidLiteral(String),
}

/// Address family tag carried on every address value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
}

impl AddressFamily {
    /// Number of raw bytes an address of this family holds
    pub fn address_len(self) -> usize {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 16,
        }
    }
}

/// Raw address bytes together with their family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAddress {
    /// 4-byte IPv4 address
    V4([u8; 4]),
    /// 16-byte IPv6 address
    V6([u8; 16]),
}

impl RawAddress {
    /// Build a raw address from a byte slice.
    ///
    /// Fails with [`AddressError::InvalidAddressLength`] unless `raw` is 4 or 16 bytes long.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, AddressError> {
        if let Ok(bytes) = <[u8; 4]>::try_from(raw) {
            return Ok(RawAddress::V4(bytes));
        }
        if let Ok(bytes) = <[u8; 16]>::try_from(raw) {
            return Ok(RawAddress::V6(bytes));
        }
        Err(AddressError::InvalidAddressLength(raw.len()))
    }

    /// Family implied by the byte length
    pub fn family(&self) -> AddressFamily {
        match self {
            RawAddress::V4(_) => AddressFamily::Ipv4,
            RawAddress::V6(_) => AddressFamily::Ipv6,
        }
    }

    /// Bytes in network order
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawAddress::V4(bytes) => &bytes[..],
            RawAddress::V6(bytes) => &bytes[..],
        }
    }

    /// Same address as a standard library value
    pub fn to_ip_addr(&self) -> IpAddr {
        match *self {
            RawAddress::V4(bytes) => IpAddr::V4(Ipv4Addr::from(bytes)),
            RawAddress::V6(bytes) => IpAddr::V6(Ipv6Addr::from(bytes)),
        }
    }
}

impl From<IpAddr> for RawAddress {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => RawAddress::V4(v4.octets()),
            IpAddr::V6(v6) => RawAddress::V6(v6.octets()),
        }
    }
}

impl From<Ipv4Addr> for RawAddress {
    fn from(ip: Ipv4Addr) -> Self {
        RawAddress::V4(ip.octets())
    }
}

impl From<Ipv6Addr> for RawAddress {
    fn from(ip: Ipv6Addr) -> Self {
        RawAddress::V6(ip.octets())
    }
}

/// An IPv4 or IPv6 address
///
/// Immutable after construction except for the hostname, which is filled at most once:
/// either from the hint given at construction or by the first call to
/// [`InetAddress::host_name`]. Equality and hashing only look at the raw bytes.
#[derive(Debug, Clone)]
pub struct InetAddress {
    raw: RawAddress,
    text: String,
    hostname: OnceLock<String>,
}

impl InetAddress {
    /// Create an address from raw bytes
    ///
    /// # Arguments
    ///
    /// * `raw` - 4 (IPv4) or 16 (IPv6) address bytes in network order
    /// * `hostname` - Optional hostname to cache instead of doing a reverse lookup later
    ///
    /// # Returns
    ///
    /// * `Ok(InetAddress)` - Created address
    /// * `Err(AddressError::InvalidAddressLength)` - `raw` has any other length
    pub fn from_bytes(raw: &[u8], hostname: Option<&str>) -> Result<Self, AddressError> {
        let raw = RawAddress::from_bytes(raw)?;
        Ok(match hostname {
            Some(name) => Self::with_hostname(raw, name),
            None => Self::from_raw(raw),
        })
    }

    /// Create an address with no hostname attached
    pub fn from_raw(raw: RawAddress) -> Self {
        Self {
            raw,
            text: raw.to_ip_addr().to_string(),
            hostname: OnceLock::new(),
        }
    }

    /// Create an address whose hostname is already known
    pub fn with_hostname(raw: RawAddress, hostname: &str) -> Self {
        let address = Self::from_raw(raw);
        let _ = address.hostname.set(hostname.to_string());
        address
    }

    /// Create an address from a standard library value
    pub fn from_ip(ip: IpAddr) -> Self {
        Self::from_raw(RawAddress::from(ip))
    }

    /// Parse a textual literal (dotted-decimal IPv4 or colon-hex IPv6).
    ///
    /// An IPv6 literal may be wrapped in brackets, as in `[::1]`. Presentation parsing is
    /// the standard library's.
    pub fn parse(literal: &str) -> Result<Self, AddressError> {
        let trimmed = literal
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'));
        let parsed = match trimmed {
            Some(inner) => inner.parse::<Ipv6Addr>().map(IpAddr::V6),
            None => literal.parse::<IpAddr>(),
        };
        parsed
            .map(Self::from_ip)
            .map_err(|_| AddressError::InvalidLiteral(literal.to_string()))
    }

    /// The loopback address of a family (`127.0.0.1` or `::1`)
    pub fn loopback(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => Self::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            AddressFamily::Ipv6 => Self::from_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)),
        }
    }

    /// The wildcard address of a family (`0.0.0.0` or `::`)
    pub fn any_local(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => Self::from_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            AddressFamily::Ipv6 => Self::from_ip(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        }
    }

    /// Family-tagged bytes
    pub fn raw(&self) -> &RawAddress {
        &self.raw
    }

    /// Raw address bytes, 4 or 16 long
    pub fn octets(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// IPv4 or IPv6
    pub fn family(&self) -> AddressFamily {
        self.raw.family()
    }

    /// Textual presentation form (no hostname)
    pub fn host_address(&self) -> &str {
        &self.text
    }

    /// Same address as a standard library value
    pub fn to_ip_addr(&self) -> IpAddr {
        self.raw.to_ip_addr()
    }

    /// Hostname for this address, looked up through `resolver` on first use.
    ///
    /// If the reverse lookup fails, the textual address becomes the hostname. Either way the
    /// result is cached and the resolver is never consulted again for this value.
    pub fn host_name(&self, resolver: &dyn Resolver) -> &str {
        self.hostname
            .get_or_init(|| match resolver.reverse_lookup(&self.raw) {
                Ok(name) => name,
                Err(err) => {
                    warn!(address = %self.text, error = %err, "reverse lookup failed, using literal");
                    self.text.clone()
                }
            })
    }

    /// Hostname if it has been set or looked up already
    pub fn cached_host_name(&self) -> Option<&str> {
        self.hostname.get().map(String::as_str)
    }

    /// Wildcard address (`0.0.0.0` or `::`)
    pub fn is_any_local_address(&self) -> bool {
        classify::is_any_local(&self.raw)
    }

    /// See [`classify::is_loopback`]
    pub fn is_loopback_address(&self) -> bool {
        classify::is_loopback(&self.raw)
    }

    /// See [`classify::is_link_local`]
    pub fn is_link_local_address(&self) -> bool {
        classify::is_link_local(&self.raw)
    }

    /// See [`classify::is_site_local`]
    pub fn is_site_local_address(&self) -> bool {
        classify::is_site_local(&self.raw)
    }

    /// See [`classify::is_multicast`]
    pub fn is_multicast_address(&self) -> bool {
        classify::is_multicast(&self.raw)
    }

    /// See [`classify::is_mc_global`]
    pub fn is_mc_global(&self) -> bool {
        classify::is_mc_global(&self.raw)
    }

    /// See [`classify::is_mc_node_local`]
    pub fn is_mc_node_local(&self) -> bool {
        classify::is_mc_node_local(&self.raw)
    }

    /// See [`classify::is_mc_link_local`]
    pub fn is_mc_link_local(&self) -> bool {
        classify::is_mc_link_local(&self.raw)
    }

    /// See [`classify::is_mc_site_local`]
    pub fn is_mc_site_local(&self) -> bool {
        classify::is_mc_site_local(&self.raw)
    }

    /// See [`classify::is_mc_org_local`]
    pub fn is_mc_org_local(&self) -> bool {
        classify::is_mc_org_local(&self.raw)
    }
}

impl PartialEq for InetAddress {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for InetAddress {}

impl Hash for InetAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<IpAddr> for InetAddress {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

impl From<&InetAddress> for IpAddr {
    fn from(address: &InetAddress) -> Self {
        address.to_ip_addr()
    }
}
