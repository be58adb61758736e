//! Adapters Layer: Name Resolution
//!
//! Provides the operating-system implementation of the
//! [`Resolver`](entities_inet_address::Resolver) contract.
//!
//! ## Overview
//!
//! - **Forward lookup**: the standard library's `ToSocketAddrs` (getaddrinfo underneath),
//!   filtered to the requested family
//! - **Reverse lookup**: `getnameinfo` with `NI_NAMEREQD`, so a missing PTR record is an
//!   error rather than a numeric echo of the address
//!
//! ## See Also
//!
//! - [`entities_inet_address`](../entities_inet_address/index.html): address model and lookup rules

pub mod system;

pub use system::SystemResolver;
