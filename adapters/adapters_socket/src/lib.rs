//! Adapters Layer: Socket Facade
//!
//! Provides a blocking, object-style socket on top of the `socket2` crate: TCP client and
//! server use, datagrams, timeout-bounded connect, OS read/write timeouts, single-socket
//! readiness polls, half-close, and an idempotent close.
//!
//! ## Overview
//!
//! The `adapters_socket` crate provides:
//! - **[`Socket`]**: lifecycle `open -> {connected} | {bound -> listening}`, with `closed`
//!   reachable from every state
//! - **Stream adapters**: [`SocketInputStream`] / [`SocketOutputStream`], `std::io::Read` and
//!   `std::io::Write` views whose `close()` closes the owning socket
//! - **Error translation**: every failing OS call becomes a [`SocketError`] tagged with the
//!   failing [`SocketOp`] and OS code; "would block" on a non-blocking socket is the separate
//!   [`SocketError::TryAgain`]
//! - **[`SocketConfig`]**: timeouts, backlog and flags, optionally read from the environment
//!
//! ## Architecture
//!
//! This crate is part of the adapters layer. It depends on:
//! - `entities_inet_address`: address values and family tags
//!
//! ## Usage
//!
//! ```rust,no_run
//! use adapters_socket::{Protocol, Socket, SocketType};
//! use entities_inet_address::InetAddress;
//!
//! let address = InetAddress::parse("127.0.0.1").unwrap();
//! let mut client = Socket::with_remote(&address, 8080, SocketType::Stream, Protocol::Tcp).unwrap();
//! client.connect_to_configured(1000).unwrap();
//! client.write(b"ping").unwrap();
//! client.close().unwrap();
//! ```
//!
//! ## See Also
//!
//! - [`entities_inet_address`](../entities_inet_address/index.html): address model
//! - [`adapters_name_resolution`](../adapters_name_resolution/index.html): hostname lookups

pub mod config;
pub mod error;
mod handle;
pub mod readiness;
pub mod socket;
pub mod stream;
pub mod timeout;

pub use config::SocketConfig;
pub use error::{SocketError, SocketOp};
pub use readiness::Readiness;
pub use socket::{domain_of, Protocol, Socket, SocketType};
pub use stream::{SocketInputStream, SocketOutputStream};
pub use timeout::{millis_to_timeval, timeval_to_millis};
