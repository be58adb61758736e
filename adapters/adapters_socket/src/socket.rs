//! Socket Module
//!
//! The [`Socket`] facade: one OS socket with its lifecycle (create, bind, connect or
//! listen/accept, half-close, close), options, timeouts and readiness polls. Every failing
//! OS call goes through the same translation so callers can tell "would block" apart from
//! real failures.

use std::mem::{self, MaybeUninit};
use std::net::{Shutdown, SocketAddr};
use std::os::unix::io::RawFd;
use std::sync::Arc;

use entities_inet_address::{AddressFamily, InetAddress};
use nix::errno::Errno;
use socket2::{Domain, Protocol as Socket2Protocol, SockAddr, Socket as Socket2, Type};
use tracing::{debug, trace, warn};

use crate::config::SocketConfig;
use crate::error::{last_os_error, translate, SocketError, SocketOp};
use crate::handle::SocketHandle;
use crate::readiness::{poll_fd, Readiness};
use crate::stream::{SocketInputStream, SocketOutputStream};
use crate::timeout::{get_socket_timeout, set_socket_timeout, snap_to_recorded, TimeoutKind};

/// Socket type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// Stream socket (TCP)
    Stream,
    /// Datagram socket (UDP)
    Datagram,
}

impl From<SocketType> for Type {
    fn from(ty: SocketType) -> Self {
        match ty {
            SocketType::Stream => Type::STREAM,
            SocketType::Datagram => Type::DGRAM,
        }
    }
}

/// Protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
}

impl From<Protocol> for Socket2Protocol {
    fn from(proto: Protocol) -> Self {
        match proto {
            Protocol::Tcp => Socket2Protocol::TCP,
            Protocol::Udp => Socket2Protocol::UDP,
        }
    }
}

/// Socket domain for an address family tag
pub fn domain_of(family: AddressFamily) -> Domain {
    match family {
        AddressFamily::Ipv4 => Domain::IPV4,
        AddressFamily::Ipv6 => Domain::IPV6,
    }
}

fn sock_addr(address: &InetAddress, port: u16) -> SockAddr {
    SockAddr::from(SocketAddr::new(address.to_ip_addr(), port))
}

fn inet_pair(addr: &SockAddr) -> Option<(InetAddress, u16)> {
    addr.as_socket()
        .map(|sa| (InetAddress::from_ip(sa.ip()), sa.port()))
}

/// Socket wrapper
///
/// Owns the OS handle exclusively. Stream adapters obtained from
/// [`Socket::input_stream`] / [`Socket::output_stream`] only borrow it weakly; closing
/// either of them closes this socket as well. Dropping the socket closes the handle.
#[derive(Debug)]
pub struct Socket {
    handle: Arc<SocketHandle>,
    family: AddressFamily,
    socket_type: SocketType,
    protocol: Protocol,
    remote: Option<(InetAddress, u16)>,
    connected: bool,
    bound: bool,
    listening: bool,
}

impl Socket {
    /// Create a new socket
    ///
    /// # Arguments
    ///
    /// * `family` - Address family (IPv4 or IPv6)
    /// * `socket_type` - Socket type (Stream or Datagram)
    /// * `protocol` - Protocol (TCP or UDP)
    ///
    /// # Returns
    ///
    /// * `Ok(Socket)` - Open socket in blocking mode
    /// * `Err(SocketError)` - Create error carrying the OS code
    pub fn new(
        family: AddressFamily,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> Result<Self, SocketError> {
        let socket = Socket2::new(domain_of(family), socket_type.into(), Some(protocol.into()))
            .map_err(|e| translate(SocketOp::Create, e, true))?;
        debug!(?family, ?socket_type, ?protocol, "socket created");
        Ok(Self::from_parts(socket, family, socket_type, protocol))
    }

    /// Create a socket for talking to `address:port`; the domain follows the address.
    ///
    /// Nothing is connected yet; see [`Socket::connect_to_configured`].
    pub fn with_remote(
        address: &InetAddress,
        port: u16,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> Result<Self, SocketError> {
        let mut socket = Self::new(address.family(), socket_type, protocol)?;
        socket.remote = Some((address.clone(), port));
        Ok(socket)
    }

    fn from_parts(
        socket: Socket2,
        family: AddressFamily,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> Self {
        Self {
            handle: Arc::new(SocketHandle::new(socket)),
            family,
            socket_type,
            protocol,
            remote: None,
            connected: false,
            bound: false,
            listening: false,
        }
    }

    /// Bind socket to an address
    ///
    /// # Arguments
    ///
    /// * `address` - Local address to bind to
    /// * `port` - Local port, 0 for an ephemeral one
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Success
    /// * `Err(SocketError)` - Bind error (address in use, permission denied, ...)
    pub fn bind(&mut self, address: &InetAddress, port: u16) -> Result<(), SocketError> {
        let target = sock_addr(address, port);
        self.handle.with(SocketOp::Bind, |s| s.bind(&target))?;
        self.bound = true;
        debug!(%address, port, "socket bound");
        Ok(())
    }

    /// Listen for incoming connections (stream sockets only)
    ///
    /// # Arguments
    ///
    /// * `backlog` - Maximum number of pending connections
    pub fn listen(&mut self, backlog: i32) -> Result<(), SocketError> {
        if self.socket_type != SocketType::Stream {
            return Err(SocketError::InvalidUsage("listen requires a stream socket"));
        }
        self.handle.with(SocketOp::Listen, |s| s.listen(backlog))?;
        self.listening = true;
        debug!(backlog, "socket listening");
        Ok(())
    }

    /// Listen with the backlog from `config`
    pub fn listen_default(&mut self, config: &SocketConfig) -> Result<(), SocketError> {
        self.listen(config.backlog)
    }

    /// Accept an incoming connection (stream sockets only)
    ///
    /// Blocks unless the listener is non-blocking, in which case an empty queue yields
    /// [`SocketError::TryAgain`].
    ///
    /// # Returns
    ///
    /// * `Ok(Socket)` - Connected blocking socket; its remote is the peer
    /// * `Err(SocketError)` - Accept error
    pub fn accept(&self) -> Result<Socket, SocketError> {
        if self.socket_type != SocketType::Stream {
            return Err(SocketError::InvalidUsage("accept requires a stream socket"));
        }

        let (socket, peer) = self.handle.io(SocketOp::Accept, |s| s.accept())?;
        // BSD-derived systems hand out the listener's O_NONBLOCK
        socket
            .set_nonblocking(false)
            .map_err(|e| translate(SocketOp::Accept, e, true))?;

        let mut accepted = Self::from_parts(socket, self.family, self.socket_type, self.protocol);
        accepted.remote = inet_pair(&peer);
        accepted.connected = true;
        if let Some((address, port)) = &accepted.remote {
            debug!(%address, port, "connection accepted");
        }
        Ok(accepted)
    }

    /// Connect to the address given to [`Socket::with_remote`]
    ///
    /// # Arguments
    ///
    /// * `timeout_ms` - 0 for a plain blocking connect, otherwise the connect budget
    pub fn connect_to_configured(&mut self, timeout_ms: u64) -> Result<(), SocketError> {
        let (address, port) = self
            .remote
            .clone()
            .ok_or(SocketError::InvalidUsage("no remote address configured"))?;
        self.connect_to(&address, port, timeout_ms)
    }

    /// Connect to a remote address
    ///
    /// With a non-zero `timeout_ms` the socket is switched to non-blocking for the duration
    /// of the attempt and back to blocking afterwards, whatever the outcome.
    ///
    /// # Arguments
    ///
    /// * `address` - Remote address
    /// * `port` - Remote port
    /// * `timeout_ms` - 0 for a plain blocking connect, otherwise the connect budget
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Connected
    /// * `Err(SocketError::ConnectionTimeout)` - Budget expired
    /// * `Err(SocketError::ConnectionRefused)` - Peer refused, or the attempt failed
    /// * `Err(SocketError::InvalidUsage)` - Timeout requested on a non-blocking socket
    pub fn connect_to(
        &mut self,
        address: &InetAddress,
        port: u16,
        timeout_ms: u64,
    ) -> Result<(), SocketError> {
        let target = sock_addr(address, port);

        if timeout_ms == 0 {
            self.handle.with(SocketOp::Connect, |s| s.connect(&target))?;
        } else {
            if !self.handle.is_blocking() {
                return Err(SocketError::InvalidUsage(
                    "connect timeout requires a blocking socket",
                ));
            }
            self.handle
                .with(SocketOp::BlockingMode, |s| s.set_nonblocking(true))?;
            let outcome = self.connect_bounded(&target, timeout_ms);
            let restored = self
                .handle
                .with(SocketOp::BlockingMode, |s| s.set_nonblocking(false));
            outcome.and_then(|()| restored)?;
        }

        self.remote = Some((address.clone(), port));
        self.connected = true;
        debug!(%address, port, timeout_ms, "socket connected");
        Ok(())
    }

    fn connect_bounded(&self, target: &SockAddr, timeout_ms: u64) -> Result<(), SocketError> {
        match self.handle.with(SocketOp::Connect, |s| s.connect(target)) {
            Ok(()) => return Ok(()),
            Err(SocketError::Os { code, .. }) if Errno::from_i32(code) == Errno::EINPROGRESS => {}
            Err(SocketError::Os { code, .. }) if Errno::from_i32(code) == Errno::ECONNREFUSED => {
                return Err(SocketError::ConnectionRefused { code });
            }
            Err(err) => return Err(err),
        }

        let ready = self.handle.with_fd(|fd| {
            poll_fd(fd, Readiness::Write, timeout_ms)
                .map_err(|e| translate(SocketOp::Connect, e, true))
        })?;
        if !ready {
            debug!(timeout_ms, "connect timed out");
            return Err(SocketError::ConnectionTimeout { millis: timeout_ms });
        }

        match self.handle.with(SocketOp::Connect, |s| s.take_error())? {
            Some(err) => Err(SocketError::ConnectionRefused {
                code: err.raw_os_error().unwrap_or(0),
            }),
            None => Ok(()),
        }
    }

    /// Read up to `max_len` bytes; an empty vector means end of stream.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>, SocketError> {
        let mut buf = vec![0u8; max_len];
        let n = self.handle.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read into `buf`, returning the number of bytes received
    pub fn read_into(&self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.handle.read(buf)
    }

    /// Write `buf`, returning the number of bytes the OS accepted
    pub fn write(&self, buf: &[u8]) -> Result<usize, SocketError> {
        self.handle.write(buf)
    }

    /// Write `len` bytes of `buf` starting at `offset`
    pub fn write_slice(&self, buf: &[u8], offset: usize, len: usize) -> Result<usize, SocketError> {
        let slice = checked_slice(buf, offset, len)?;
        self.handle.write(slice)
    }

    /// Send a datagram to `address:port`
    pub fn send_to(&self, buf: &[u8], address: &InetAddress, port: u16) -> Result<usize, SocketError> {
        let target = sock_addr(address, port);
        let n = self.handle.io(SocketOp::Write, |s| s.send_to(buf, &target))?;
        trace!(bytes = n, %address, port, "send_to");
        Ok(n)
    }

    /// Receive a datagram, returning its length and sender
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, InetAddress, u16), SocketError> {
        // Safety: u8 and MaybeUninit<u8> share layout; recv_from only writes into the buffer
        let uninit_buf: &mut [MaybeUninit<u8>] = unsafe {
            std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len())
        };
        let (n, from) = self.handle.io(SocketOp::Read, |s| s.recv_from(uninit_buf))?;
        let (address, port) =
            inet_pair(&from).ok_or(SocketError::InvalidUsage("sender is not an inet address"))?;
        trace!(bytes = n, %address, port, "recv_from");
        Ok((n, address, port))
    }

    /// Read an integer socket option
    ///
    /// # Arguments
    ///
    /// * `level` - Option level (`SOL_SOCKET`, `IPPROTO_TCP`, ...)
    /// * `name` - Option name at that level
    pub fn get_option(&self, level: i32, name: i32) -> Result<i32, SocketError> {
        self.handle.with_fd(|fd| getsockopt_int(fd, level, name))
    }

    /// Set an integer socket option
    pub fn set_option(&self, level: i32, name: i32, value: i32) -> Result<(), SocketError> {
        self.handle.with_fd(|fd| setsockopt_int(fd, level, name, value))
    }

    /// Set the OS receive timeout in milliseconds; 0 disables it
    pub fn set_read_timeout(&self, millis: u64) -> Result<(), SocketError> {
        self.handle
            .with_fd(|fd| set_socket_timeout(fd, TimeoutKind::Receive, millis))?;
        self.handle.record_read_timeout(millis);
        Ok(())
    }

    /// Current OS receive timeout in milliseconds
    ///
    /// Whole milliseconds set through [`Socket::set_read_timeout`] read back unchanged even
    /// where the kernel keeps the timeout in scheduler ticks.
    pub fn read_timeout(&self) -> Result<u64, SocketError> {
        let kernel = self
            .handle
            .with_fd(|fd| get_socket_timeout(fd, TimeoutKind::Receive))?;
        Ok(snap_to_recorded(kernel, self.handle.recorded_read_timeout()))
    }

    /// Set the OS send timeout in milliseconds; 0 disables it
    pub fn set_write_timeout(&self, millis: u64) -> Result<(), SocketError> {
        self.handle
            .with_fd(|fd| set_socket_timeout(fd, TimeoutKind::Send, millis))?;
        self.handle.record_write_timeout(millis);
        Ok(())
    }

    /// Current OS send timeout in milliseconds, read back like [`Socket::read_timeout`]
    pub fn write_timeout(&self) -> Result<u64, SocketError> {
        let kernel = self
            .handle
            .with_fd(|fd| get_socket_timeout(fd, TimeoutKind::Send))?;
        Ok(snap_to_recorded(kernel, self.handle.recorded_write_timeout()))
    }

    /// Wait up to `timeout_ms` for readable data (or end of stream)
    pub fn select_read(&self, timeout_ms: u64) -> Result<bool, SocketError> {
        self.select(Readiness::Read, timeout_ms)
    }

    /// Wait up to `timeout_ms` until a write would not block
    pub fn select_write(&self, timeout_ms: u64) -> Result<bool, SocketError> {
        self.select(Readiness::Write, timeout_ms)
    }

    /// Wait up to `timeout_ms` for an exceptional condition
    pub fn select_exception(&self, timeout_ms: u64) -> Result<bool, SocketError> {
        self.select(Readiness::Exception, timeout_ms)
    }

    fn select(&self, readiness: Readiness, timeout_ms: u64) -> Result<bool, SocketError> {
        let ready = self.handle.with_fd(|fd| {
            poll_fd(fd, readiness, timeout_ms).map_err(|e| translate(SocketOp::Select, e, true))
        })?;
        trace!(?readiness, timeout_ms, ready, "select");
        Ok(ready)
    }

    /// Switch blocking mode; does nothing when the mode is already `blocking`.
    pub fn set_blocking(&self, blocking: bool) -> Result<(), SocketError> {
        if self.handle.is_blocking() == blocking {
            return Ok(());
        }
        self.handle
            .with(SocketOp::BlockingMode, |s| s.set_nonblocking(!blocking))?;
        self.handle.set_blocking_flag(blocking);
        debug!(blocking, "blocking mode changed");
        Ok(())
    }

    /// Shut down the receiving half; later reads report end of stream.
    pub fn shutdown_input(&self) -> Result<(), SocketError> {
        if self.handle.is_input_shutdown() {
            return Ok(());
        }
        self.handle
            .with(SocketOp::Shutdown, |s| s.shutdown(Shutdown::Read))?;
        self.handle.mark_input_shutdown();
        debug!("input shut down");
        Ok(())
    }

    /// Shut down the sending half; later writes fail with [`SocketError::HalfClosed`].
    pub fn shutdown_output(&self) -> Result<(), SocketError> {
        if self.handle.is_output_shutdown() {
            return Ok(());
        }
        self.handle
            .with(SocketOp::Shutdown, |s| s.shutdown(Shutdown::Write))?;
        self.handle.mark_output_shutdown();
        debug!("output shut down");
        Ok(())
    }

    /// Close the socket. Closing twice is not an error.
    pub fn close(&self) -> Result<(), SocketError> {
        self.handle.close()
    }

    /// Local address and port the socket is bound to
    pub fn local_address(&self) -> Result<(InetAddress, u16), SocketError> {
        let local = self.handle.with(SocketOp::Option, |s| s.local_addr())?;
        inet_pair(&local).ok_or(SocketError::InvalidUsage("local address is not an inet address"))
    }

    /// Remote address and port, once configured, connected or accepted
    pub fn remote(&self) -> Option<(&InetAddress, u16)> {
        self.remote.as_ref().map(|(address, port)| (address, *port))
    }

    pub fn set_reuse_address(&self, reuse: bool) -> Result<(), SocketError> {
        self.handle
            .with(SocketOp::Option, |s| s.set_reuse_address(reuse))
    }

    pub fn set_tcp_nodelay(&self, nodelay: bool) -> Result<(), SocketError> {
        self.handle.with(SocketOp::Option, |s| s.set_nodelay(nodelay))
    }

    /// Apply timeouts and flags from `config`
    pub fn apply_config(&self, config: &SocketConfig) -> Result<(), SocketError> {
        self.set_read_timeout(config.read_timeout_ms)?;
        self.set_write_timeout(config.write_timeout_ms)?;
        self.set_reuse_address(config.reuse_address)?;
        if self.socket_type == SocketType::Stream {
            self.set_tcp_nodelay(config.tcp_nodelay)?;
        }
        Ok(())
    }

    /// Apply `config` and connect to the address given to [`Socket::with_remote`]
    ///
    /// # Arguments
    ///
    /// * `config` - Timeouts and flags; `connect_timeout_ms` bounds the connect
    pub fn connect_with_config(&mut self, config: &SocketConfig) -> Result<(), SocketError> {
        self.apply_config(config)?;
        self.connect_to_configured(config.connect_timeout_ms)
    }

    /// Reading half as a stream adapter
    pub fn input_stream(&self) -> Result<SocketInputStream, SocketError> {
        self.ensure_streamable()?;
        if self.handle.is_input_shutdown() {
            return Err(SocketError::HalfClosed(SocketOp::Read));
        }
        Ok(SocketInputStream::new(Arc::downgrade(&self.handle)))
    }

    /// Writing half as a stream adapter
    pub fn output_stream(&self) -> Result<SocketOutputStream, SocketError> {
        self.ensure_streamable()?;
        if self.handle.is_output_shutdown() {
            return Err(SocketError::HalfClosed(SocketOp::Write));
        }
        Ok(SocketOutputStream::new(Arc::downgrade(&self.handle)))
    }

    fn ensure_streamable(&self) -> Result<(), SocketError> {
        if self.handle.is_closed() {
            return Err(SocketError::Closed);
        }
        if !self.connected {
            return Err(SocketError::InvalidUsage("socket is not connected"));
        }
        Ok(())
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.handle.is_closed()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_listening(&self) -> bool {
        self.listening && !self.handle.is_closed()
    }

    pub fn is_blocking(&self) -> bool {
        self.handle.is_blocking()
    }

    pub fn is_input_shutdown(&self) -> bool {
        self.handle.is_input_shutdown()
    }

    pub fn is_output_shutdown(&self) -> bool {
        self.handle.is_output_shutdown()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(err) = self.handle.close() {
            warn!(error = %err, "closing socket on drop failed");
        }
    }
}

pub(crate) fn checked_slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], SocketError> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(SocketError::InvalidUsage("offset and length exceed the buffer"))
}

fn getsockopt_int(fd: RawFd, level: i32, name: i32) -> Result<i32, SocketError> {
    let mut value: libc::c_int = 0;
    let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
    // Safety: `value` and `len` are valid for writes of the sizes given
    let ret = unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if ret != 0 {
        return Err(last_os_error(SocketOp::Option, true));
    }
    Ok(value)
}

fn setsockopt_int(fd: RawFd, level: i32, name: i32, value: i32) -> Result<(), SocketError> {
    let value: libc::c_int = value;
    // Safety: `value` lives across the call and its size is passed alongside
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(last_os_error(SocketOp::Option, true));
    }
    Ok(())
}
