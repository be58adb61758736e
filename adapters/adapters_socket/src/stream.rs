//! Stream Module
//!
//! Byte-stream views of a connected socket. The adapters hold a weak reference to the
//! socket's handle: they never keep it alive on their own, and closing one closes the
//! socket through the same path [`Socket::close`](crate::Socket::close) uses.

use std::io;
use std::sync::{Arc, Weak};

use crate::error::SocketError;
use crate::handle::SocketHandle;
use crate::socket::checked_slice;

fn upgrade(handle: &Weak<SocketHandle>) -> Result<Arc<SocketHandle>, SocketError> {
    handle.upgrade().ok_or(SocketError::Closed)
}

fn close(handle: &Weak<SocketHandle>) -> Result<(), SocketError> {
    match handle.upgrade() {
        Some(handle) => handle.close(),
        None => Ok(()),
    }
}

fn is_closed(handle: &Weak<SocketHandle>) -> bool {
    handle.upgrade().map_or(true, |handle| handle.is_closed())
}

/// Reading half of a connected socket
#[derive(Debug, Clone)]
pub struct SocketInputStream {
    handle: Weak<SocketHandle>,
}

impl SocketInputStream {
    pub(crate) fn new(handle: Weak<SocketHandle>) -> Self {
        Self { handle }
    }

    /// Read up to `max_len` bytes; an empty vector means end of stream.
    pub fn read_bytes(&self, max_len: usize) -> Result<Vec<u8>, SocketError> {
        let mut buf = vec![0u8; max_len];
        let n = upgrade(&self.handle)?.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn read_into(&self, buf: &mut [u8]) -> Result<usize, SocketError> {
        upgrade(&self.handle)?.read(buf)
    }

    /// Close the owning socket
    pub fn close(&self) -> Result<(), SocketError> {
        close(&self.handle)
    }

    pub fn is_closed(&self) -> bool {
        is_closed(&self.handle)
    }
}

impl io::Read for SocketInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

/// Writing half of a connected socket
#[derive(Debug, Clone)]
pub struct SocketOutputStream {
    handle: Weak<SocketHandle>,
}

impl SocketOutputStream {
    pub(crate) fn new(handle: Weak<SocketHandle>) -> Self {
        Self { handle }
    }

    pub fn write_bytes(&self, buf: &[u8]) -> Result<usize, SocketError> {
        upgrade(&self.handle)?.write(buf)
    }

    /// Write `len` bytes of `buf` starting at `offset`
    pub fn write_slice(&self, buf: &[u8], offset: usize, len: usize) -> Result<usize, SocketError> {
        let slice = checked_slice(buf, offset, len)?;
        upgrade(&self.handle)?.write(slice)
    }

    /// Close the owning socket
    pub fn close(&self) -> Result<(), SocketError> {
        close(&self.handle)
    }

    pub fn is_closed(&self) -> bool {
        is_closed(&self.handle)
    }
}

impl io::Write for SocketOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
