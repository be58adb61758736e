//! Error Module
//!
//! Socket error taxonomy and the single translation path every failing OS call goes
//! through.

use std::fmt;
use std::io;

use entities_inet_address::AddressError;
use thiserror::Error;

/// The socket primitive that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOp {
    Create,
    Bind,
    Connect,
    Listen,
    Accept,
    Read,
    Write,
    Option,
    BlockingMode,
    Shutdown,
    Select,
    Close,
}

impl SocketOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SocketOp::Create => "create",
            SocketOp::Bind => "bind",
            SocketOp::Connect => "connect",
            SocketOp::Listen => "listen",
            SocketOp::Accept => "accept",
            SocketOp::Read => "read",
            SocketOp::Write => "write",
            SocketOp::Option => "option",
            SocketOp::BlockingMode => "blocking mode",
            SocketOp::Shutdown => "shutdown",
            SocketOp::Select => "select",
            SocketOp::Close => "close",
        }
    }
}

impl fmt::Display for SocketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Socket error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// OS-level failure of one primitive, with the underlying error code
    #[error("socket {op} failed: {message} (os error {code})")]
    Os {
        op: SocketOp,
        message: String,
        code: i32,
    },
    /// Non-blocking operation would have blocked
    #[error("operation would block, try again")]
    TryAgain,
    /// Timeout-bounded connect did not complete in time
    #[error("connect timed out after {millis} ms")]
    ConnectionTimeout { millis: u64 },
    /// Timeout-bounded connect completed with a pending socket error
    #[error("connection refused (os error {code})")]
    ConnectionRefused { code: i32 },
    /// Blocking read or write ran into its configured OS-level timeout
    #[error("socket {op} timed out after {millis} ms")]
    Timeout { op: SocketOp, millis: u64 },
    /// The socket has been closed
    #[error("socket is closed")]
    Closed,
    /// The direction needed by this operation has been shut down
    #[error("socket {0} side is shut down")]
    HalfClosed(SocketOp),
    /// Invalid argument combination; a caller bug, never retried
    #[error("invalid usage: {0}")]
    InvalidUsage(&'static str),
    /// Address conversion failed
    #[error(transparent)]
    Address(#[from] AddressError),
}

impl SocketError {
    /// OS error code, when the failure came from the operating system
    pub fn code(&self) -> Option<i32> {
        match self {
            SocketError::Os { code, .. } | SocketError::ConnectionRefused { code } => Some(*code),
            _ => None,
        }
    }

    /// Operation that produced an [`SocketError::Os`] or [`SocketError::Timeout`]
    pub fn op(&self) -> Option<SocketOp> {
        match self {
            SocketError::Os { op, .. } | SocketError::Timeout { op, .. } => Some(*op),
            SocketError::HalfClosed(op) => Some(*op),
            _ => None,
        }
    }

    pub fn is_try_again(&self) -> bool {
        matches!(self, SocketError::TryAgain)
    }
}

impl From<SocketError> for io::Error {
    fn from(err: SocketError) -> Self {
        match err {
            SocketError::Os { code, .. } if code != 0 => io::Error::from_raw_os_error(code),
            SocketError::TryAgain => io::Error::from(io::ErrorKind::WouldBlock),
            SocketError::Timeout { .. } | SocketError::ConnectionTimeout { .. } => {
                io::Error::new(io::ErrorKind::TimedOut, err)
            }
            SocketError::ConnectionRefused { .. } => {
                io::Error::new(io::ErrorKind::ConnectionRefused, err)
            }
            SocketError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            SocketError::HalfClosed(_) => io::Error::new(io::ErrorKind::BrokenPipe, err),
            SocketError::InvalidUsage(_) | SocketError::Address(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

/// Translate a failed OS call.
///
/// "Would block" on a non-blocking socket becomes [`SocketError::TryAgain`]; everything
/// else keeps its message and OS code.
pub(crate) fn translate(op: SocketOp, err: io::Error, blocking: bool) -> SocketError {
    if !blocking && err.kind() == io::ErrorKind::WouldBlock {
        return SocketError::TryAgain;
    }
    SocketError::Os {
        op,
        message: err.to_string(),
        code: err.raw_os_error().unwrap_or(0),
    }
}

/// Translate the calling thread's last OS error
pub(crate) fn last_os_error(op: SocketOp, blocking: bool) -> SocketError {
    translate(op, io::Error::last_os_error(), blocking)
}
