//! Config Module
//!
//! Defaults applied to sockets by callers that do not want to pick every knob by hand.

use std::env;
use std::str::FromStr;

use tracing::warn;

pub const ENV_CONNECT_TIMEOUT_MS: &str = "INET_SOCKET_CONNECT_TIMEOUT_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "INET_SOCKET_READ_TIMEOUT_MS";
pub const ENV_WRITE_TIMEOUT_MS: &str = "INET_SOCKET_WRITE_TIMEOUT_MS";
pub const ENV_BACKLOG: &str = "INET_SOCKET_BACKLOG";
pub const ENV_REUSE_ADDRESS: &str = "INET_SOCKET_REUSE_ADDRESS";
pub const ENV_TCP_NODELAY: &str = "INET_SOCKET_TCP_NODELAY";

/// Socket configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Connect budget in milliseconds; 0 connects without a timeout
    pub connect_timeout_ms: u64,
    /// OS receive timeout in milliseconds; 0 disables it
    pub read_timeout_ms: u64,
    /// OS send timeout in milliseconds; 0 disables it
    pub write_timeout_ms: u64,
    /// Pending-connection queue length for listeners
    pub backlog: i32,
    pub reuse_address: bool,
    pub tcp_nodelay: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            backlog: 50,
            reuse_address: false,
            tcp_nodelay: false,
        }
    }
}

impl SocketConfig {
    /// Defaults overlaid with the `INET_SOCKET_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns per variable name.
    ///
    /// Values that do not parse are skipped with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        overlay(&lookup, ENV_CONNECT_TIMEOUT_MS, &mut config.connect_timeout_ms);
        overlay(&lookup, ENV_READ_TIMEOUT_MS, &mut config.read_timeout_ms);
        overlay(&lookup, ENV_WRITE_TIMEOUT_MS, &mut config.write_timeout_ms);
        overlay(&lookup, ENV_BACKLOG, &mut config.backlog);
        overlay_flag(&lookup, ENV_REUSE_ADDRESS, &mut config.reuse_address);
        overlay_flag(&lookup, ENV_TCP_NODELAY, &mut config.tcp_nodelay);
        config
    }
}

fn overlay<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable socket setting"),
    }
}

fn overlay_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut bool) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *slot = true,
        "0" | "false" | "no" | "off" => *slot = false,
        _ => warn!(key, value = %raw, "ignoring unparsable socket flag"),
    }
}
