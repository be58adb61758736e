//! Readiness Module
//!
//! Bounded single-descriptor readiness polls. Only one socket is ever watched; there is
//! no event loop here.

use std::io;
use std::os::unix::io::RawFd;

/// Readiness class to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Data (or end of stream) can be read
    Read,
    /// Data can be written, or a pending connect finished
    Write,
    /// Urgent/exceptional condition
    Exception,
}

impl Readiness {
    fn events(self) -> libc::c_short {
        match self {
            Readiness::Read => libc::POLLIN,
            Readiness::Write => libc::POLLOUT,
            Readiness::Exception => libc::POLLPRI,
        }
    }
}

/// Wait until `fd` is ready for `readiness` or `timeout_millis` elapses.
///
/// A zero timeout checks once without waiting. Error and hang-up conditions count as
/// ready so the caller's follow-up call observes them.
pub(crate) fn poll_fd(fd: RawFd, readiness: Readiness, timeout_millis: u64) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: readiness.events(),
        revents: 0,
    };
    let timeout = timeout_millis.min(libc::c_int::MAX as u64) as libc::c_int;

    // Safety: one valid pollfd, count 1
    let ret = unsafe { libc::poll(&mut pollfd, 1, timeout) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret > 0 && pollfd.revents != 0)
}
