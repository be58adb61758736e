//! Entities Layer: Internet Addresses
//!
//! Provides the binary IPv4/IPv6 address model used by the socket facade. An address is
//! a fixed-length byte sequence (4 or 16 bytes) tagged with its family, a cached textual
//! form, and a hostname that is looked up lazily on first request.
//!
//! ## Overview
//!
//! The `entities_inet_address` crate is the innermost layer of the workspace. It performs no
//! I/O of its own:
//! - **[`address`](address/index.html)**: `AddressFamily`, `RawAddress` and `InetAddress`
//! - **[`classify`](classify/index.html)**: loopback, link-local, site-local and multicast
//!   scope predicates computed from fixed byte positions
//! - **[`resolve`](resolve/index.html)**: the `Resolver` collaborator contract and the
//!   `resolve_all` / `resolve_one` lookup rules built on it
//!
//! ## Usage
//!
//! ```rust
//! use entities_inet_address::InetAddress;
//!
//! let address = InetAddress::from_bytes(&[224, 0, 0, 251], None).unwrap();
//! assert!(address.is_mc_link_local());
//! assert!(!address.is_mc_global());
//! assert_eq!(address.host_address(), "224.0.0.251");
//! ```
//!
//! ## See Also
//!
//! - [`adapters_name_resolution`](../adapters_name_resolution/index.html): OS-backed resolver
//! - [`adapters_socket`](../adapters_socket/index.html): socket facade consuming these addresses

pub mod address;
pub mod classify;
pub mod resolve;

pub use address::{AddressError, AddressFamily, InetAddress, RawAddress};
pub use classify::AddressClasses;
pub use resolve::{resolve_all, resolve_one, FamilyMask, ResolveError, Resolver};
