//! Shared OS handle.
//!
//! One `SocketHandle` exists per open socket. The owning [`Socket`](crate::Socket) holds
//! the only strong reference; stream adapters hold weak ones. Closing through either
//! side takes the descriptor out of the lock, so it is released exactly once.

use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use socket2::Socket as Socket2;
use tracing::{debug, trace};

use crate::error::{last_os_error, translate, SocketError, SocketOp};

#[derive(Debug)]
pub(crate) struct SocketHandle {
    socket: RwLock<Option<Socket2>>,
    blocking: AtomicBool,
    input_shutdown: AtomicBool,
    output_shutdown: AtomicBool,
    read_timeout_ms: AtomicU64,
    write_timeout_ms: AtomicU64,
}

impl SocketHandle {
    pub(crate) fn new(socket: Socket2) -> Self {
        Self {
            socket: RwLock::new(Some(socket)),
            blocking: AtomicBool::new(true),
            input_shutdown: AtomicBool::new(false),
            output_shutdown: AtomicBool::new(false),
            read_timeout_ms: AtomicU64::new(0),
            write_timeout_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::Acquire)
    }

    pub(crate) fn set_blocking_flag(&self, blocking: bool) {
        self.blocking.store(blocking, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub(crate) fn is_input_shutdown(&self) -> bool {
        self.input_shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn is_output_shutdown(&self) -> bool {
        self.output_shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn mark_input_shutdown(&self) {
        self.input_shutdown.store(true, Ordering::Release);
    }

    pub(crate) fn mark_output_shutdown(&self) {
        self.output_shutdown.store(true, Ordering::Release);
    }

    pub(crate) fn recorded_read_timeout(&self) -> u64 {
        self.read_timeout_ms.load(Ordering::Acquire)
    }

    pub(crate) fn recorded_write_timeout(&self) -> u64 {
        self.write_timeout_ms.load(Ordering::Acquire)
    }

    pub(crate) fn record_read_timeout(&self, millis: u64) {
        self.read_timeout_ms.store(millis, Ordering::Release);
    }

    pub(crate) fn record_write_timeout(&self, millis: u64) {
        self.write_timeout_ms.store(millis, Ordering::Release);
    }

    /// Run `f` against the open socket, translating its failure for `op`.
    pub(crate) fn with<T>(
        &self,
        op: SocketOp,
        f: impl FnOnce(&Socket2) -> std::io::Result<T>,
    ) -> Result<T, SocketError> {
        let guard = self.socket.read().unwrap_or_else(PoisonError::into_inner);
        let socket = guard.as_ref().ok_or(SocketError::Closed)?;
        f(socket).map_err(|err| translate(op, err, self.is_blocking()))
    }

    /// Run `f` against the raw descriptor of the open socket.
    pub(crate) fn with_fd<T>(
        &self,
        f: impl FnOnce(RawFd) -> Result<T, SocketError>,
    ) -> Result<T, SocketError> {
        let guard = self.socket.read().unwrap_or_else(PoisonError::into_inner);
        let socket = guard.as_ref().ok_or(SocketError::Closed)?;
        f(socket.as_raw_fd())
    }

    /// Blocking-aware I/O call with timeout bookkeeping.
    ///
    /// A blocking socket whose configured read/write timeout expires reports
    /// [`SocketError::Timeout`] instead of a bare `EAGAIN`.
    pub(crate) fn io<T>(
        &self,
        op: SocketOp,
        f: impl FnOnce(&Socket2) -> std::io::Result<T>,
    ) -> Result<T, SocketError> {
        let guard = self.socket.read().unwrap_or_else(PoisonError::into_inner);
        let socket = guard.as_ref().ok_or(SocketError::Closed)?;
        let blocking = self.is_blocking();

        let started = Instant::now();
        let result = f(socket);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                trace!(%op, elapsed_ms, "socket io done");
                Ok(value)
            }
            Err(err) => {
                let timeout = self.timeout_for(op);
                let timed_out = matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                );
                if blocking && timeout > 0 && timed_out {
                    trace!(%op, elapsed_ms, timeout, "socket io timed out");
                    return Err(SocketError::Timeout { op, millis: timeout });
                }
                Err(translate(op, err, blocking))
            }
        }
    }

    pub(crate) fn read(&self, buf: &mut [u8]) -> Result<usize, SocketError> {
        if self.is_input_shutdown() {
            self.ensure_open()?;
            return Ok(0);
        }
        let n = self.io(SocketOp::Read, |socket| {
            let mut socket = socket;
            socket.read(buf)
        })?;
        trace!(bytes = n, "read");
        Ok(n)
    }

    pub(crate) fn write(&self, buf: &[u8]) -> Result<usize, SocketError> {
        self.ensure_open()?;
        if self.is_output_shutdown() {
            return Err(SocketError::HalfClosed(SocketOp::Write));
        }
        let n = self.io(SocketOp::Write, |socket| {
            let mut socket = socket;
            socket.write(buf)
        })?;
        trace!(bytes = n, "write");
        Ok(n)
    }

    /// Release the descriptor. Later calls are no-ops.
    pub(crate) fn close(&self) -> Result<(), SocketError> {
        let taken = self
            .socket
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(socket) = taken else {
            return Ok(());
        };

        let fd = socket.into_raw_fd();
        // Safety: `fd` came out of the socket above and is owned by nobody else now
        if unsafe { libc::close(fd) } != 0 {
            return Err(last_os_error(SocketOp::Close, true));
        }
        debug!(fd, "socket closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SocketError> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        Ok(())
    }

    fn timeout_for(&self, op: SocketOp) -> u64 {
        match op {
            SocketOp::Read | SocketOp::Accept => self.read_timeout_ms.load(Ordering::Acquire),
            SocketOp::Write => self.write_timeout_ms.load(Ordering::Acquire),
            _ => 0,
        }
    }
}
