//! System Resolver Module
//!
//! Hostname lookups through the platform resolver.

use std::net::{IpAddr, ToSocketAddrs};

use entities_inet_address::{AddressFamily, RawAddress, ResolveError, Resolver};
use tracing::trace;

/// Resolver backed by the operating system (hosts file, DNS, NSS, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for SystemResolver {
    fn lookup_host(&self, host: &str, family: AddressFamily) -> Result<Vec<RawAddress>, ResolveError> {
        let resolved = (host, 0u16)
            .to_socket_addrs()
            .map_err(|e| ResolveError::Failed(format!("{}: {}", host, e)))?;

        let mut raws: Vec<RawAddress> = Vec::new();
        for socket_addr in resolved {
            let raw = RawAddress::from(socket_addr.ip());
            // getaddrinfo reports one entry per socket type; keep the first of each
            if raw.family() == family && !raws.contains(&raw) {
                raws.push(raw);
            }
        }
        trace!(host, ?family, count = raws.len(), "forward lookup");
        Ok(raws)
    }

    fn reverse_lookup(&self, address: &RawAddress) -> Result<String, ResolveError> {
        let name = name_info(address.to_ip_addr())?;
        trace!(address = %address.to_ip_addr(), name = %name, "reverse lookup");
        Ok(name)
    }
}

#[cfg(unix)]
fn name_info(ip: IpAddr) -> Result<String, ResolveError> {
    use std::ffi::CStr;
    use std::mem;
    use std::ptr;

    let mut host = [0 as libc::c_char; libc::NI_MAXHOST as usize];

    let ret = match ip {
        IpAddr::V4(v4) => {
            // Safety: sockaddr_in is plain old data; all-zero is a valid value
            let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(v4.octets()),
            };
            #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
            {
                sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
            }
            unsafe {
                libc::getnameinfo(
                    &sin as *const libc::sockaddr_in as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    host.as_mut_ptr(),
                    host.len() as libc::socklen_t,
                    ptr::null_mut(),
                    0,
                    libc::NI_NAMEREQD,
                )
            }
        }
        IpAddr::V6(v6) => {
            // Safety: sockaddr_in6 is plain old data; all-zero is a valid value
            let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_addr = libc::in6_addr {
                s6_addr: v6.octets(),
            };
            #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
            {
                sin6.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
            }
            unsafe {
                libc::getnameinfo(
                    &sin6 as *const libc::sockaddr_in6 as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    host.as_mut_ptr(),
                    host.len() as libc::socklen_t,
                    ptr::null_mut(),
                    0,
                    libc::NI_NAMEREQD,
                )
            }
        }
    };

    if ret != 0 {
        // Safety: gai_strerror returns a static NUL-terminated string
        let reason = unsafe { CStr::from_ptr(libc::gai_strerror(ret)) }
            .to_string_lossy()
            .into_owned();
        return Err(if ret == libc::EAI_NONAME {
            ResolveError::NotFound(format!("{}: {}", ip, reason))
        } else {
            ResolveError::Failed(format!("{}: {}", ip, reason))
        });
    }

    // Safety: getnameinfo succeeded, so `host` holds a NUL-terminated name
    let name = unsafe { CStr::from_ptr(host.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn name_info(ip: IpAddr) -> Result<String, ResolveError> {
    Err(ResolveError::Failed(format!(
        "{}: reverse lookup unsupported on this platform",
        ip
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_host_lookup() {
        let resolver = SystemResolver::new();
        let raws = resolver.lookup_host("127.0.0.1", AddressFamily::Ipv4).unwrap();
        assert_eq!(raws, vec![RawAddress::V4([127, 0, 0, 1])]);
    }

    #[test]
    fn test_numeric_host_wrong_family() {
        let resolver = SystemResolver::new();
        let raws = resolver.lookup_host("127.0.0.1", AddressFamily::Ipv6).unwrap();
        assert!(raws.is_empty());
    }

    #[test]
    fn test_invalid_tld_yields_nothing() {
        let resolver = SystemResolver::new();
        match resolver.lookup_host("nonexistent.invalid", AddressFamily::Ipv4) {
            Ok(raws) => assert!(raws.is_empty()),
            Err(ResolveError::Failed(msg)) => assert!(msg.starts_with("nonexistent.invalid")),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_reverse_lookup_loopback() {
        let resolver = SystemResolver::new();
        // hosts files differ between machines; only require a non-empty answer when present
        if let Ok(name) = resolver.reverse_lookup(&RawAddress::V4([127, 0, 0, 1])) {
            assert!(!name.is_empty());
        }
    }
}
