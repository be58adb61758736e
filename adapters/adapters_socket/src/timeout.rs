//! Timeout Module
//!
//! Conversion between millisecond timeouts and the split seconds/microseconds `timeval`
//! used by `SO_RCVTIMEO` / `SO_SNDTIMEO`. A zero timeval means "no timeout" to the OS, and
//! zero milliseconds means the same here.

use std::mem;
use std::os::unix::io::RawFd;

use crate::error::{last_os_error, SocketError, SocketOp};

/// Milliseconds to `timeval`; whole milliseconds survive the round trip.
pub fn millis_to_timeval(millis: u64) -> libc::timeval {
    libc::timeval {
        tv_sec: (millis / 1000).min(libc::time_t::MAX as u64) as libc::time_t,
        tv_usec: ((millis % 1000) * 1000) as libc::suseconds_t,
    }
}

/// `timeval` to milliseconds; sub-millisecond remainders are dropped.
pub fn timeval_to_millis(tv: &libc::timeval) -> u64 {
    let secs = tv.tv_sec.max(0) as u64;
    let micros = tv.tv_usec.max(0) as u64;
    secs * 1000 + micros / 1000
}

/// Largest difference tick-based kernel storage adds to a timeout (one 100 Hz tick)
const KERNEL_ROUNDING_MS: u64 = 10;

/// Report the millisecond value the caller set when the kernel's read-back only differs
/// from it by tick rounding; any other kernel value wins.
///
/// # Arguments
///
/// * `kernel` - Value read back through `getsockopt`
/// * `recorded` - Value last set through this socket
pub fn snap_to_recorded(kernel: u64, recorded: u64) -> u64 {
    if kernel >= recorded && kernel - recorded < KERNEL_ROUNDING_MS && recorded > 0 {
        recorded
    } else {
        kernel
    }
}

/// Which OS-level timeout to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeoutKind {
    Receive,
    Send,
}

impl TimeoutKind {
    fn option_name(self) -> libc::c_int {
        match self {
            TimeoutKind::Receive => libc::SO_RCVTIMEO,
            TimeoutKind::Send => libc::SO_SNDTIMEO,
        }
    }
}

pub(crate) fn set_socket_timeout(fd: RawFd, kind: TimeoutKind, millis: u64) -> Result<(), SocketError> {
    let tv = millis_to_timeval(millis);
    // Safety: `tv` lives across the call and its size is passed alongside
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            kind.option_name(),
            &tv as *const libc::timeval as *const libc::c_void,
            mem::size_of::<libc::timeval>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(last_os_error(SocketOp::Option, true));
    }
    Ok(())
}

pub(crate) fn get_socket_timeout(fd: RawFd, kind: TimeoutKind) -> Result<u64, SocketError> {
    let mut tv = millis_to_timeval(0);
    let mut len = mem::size_of::<libc::timeval>() as libc::socklen_t;
    // Safety: `tv` and `len` are valid for writes of the sizes given
    let ret = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            kind.option_name(),
            &mut tv as *mut libc::timeval as *mut libc::c_void,
            &mut len,
        )
    };
    if ret != 0 {
        return Err(last_os_error(SocketOp::Option, true));
    }
    Ok(timeval_to_millis(&tv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_250ms_round_trip() {
        let tv = millis_to_timeval(250);
        assert_eq!(tv.tv_sec, 0);
        assert_eq!(tv.tv_usec, 250_000);
        assert_eq!(timeval_to_millis(&tv), 250);
    }

    #[test]
    fn test_whole_millis_round_trip() {
        for millis in [0u64, 1, 999, 1000, 1001, 59_999, 3_600_000] {
            assert_eq!(timeval_to_millis(&millis_to_timeval(millis)), millis);
        }
    }

    #[test]
    fn test_split_seconds() {
        let tv = millis_to_timeval(2_345);
        assert_eq!(tv.tv_sec, 2);
        assert_eq!(tv.tv_usec, 345_000);
    }

    #[test]
    fn test_huge_millis_clamped() {
        let tv = millis_to_timeval(u64::MAX);
        assert!(tv.tv_sec > 0);
        assert_eq!(
            tv.tv_sec as u64,
            (u64::MAX / 1000).min(libc::time_t::MAX as u64)
        );
        assert_eq!(tv.tv_usec, 615_000);
    }

    #[test]
    fn test_snap_to_recorded() {
        // tick rounding at 250 Hz
        assert_eq!(snap_to_recorded(252, 250), 250);
        assert_eq!(snap_to_recorded(4, 1), 1);
        assert_eq!(snap_to_recorded(36, 33), 33);
        assert_eq!(snap_to_recorded(1236, 1234), 1234);
        assert_eq!(snap_to_recorded(250, 250), 250);

        // changed behind our back, or never set here
        assert_eq!(snap_to_recorded(500, 250), 500);
        assert_eq!(snap_to_recorded(0, 250), 0);
        assert_eq!(snap_to_recorded(8, 0), 8);
    }

    #[test]
    fn test_sub_millisecond_truncated() {
        let tv = libc::timeval {
            tv_sec: 1,
            tv_usec: 500_999,
        };
        assert_eq!(timeval_to_millis(&tv), 1_500);
    }
}
