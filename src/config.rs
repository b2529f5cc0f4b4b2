//! Relay configuration.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use std::path::PathBuf;

/// Env var overriding the default socket path.
pub const SOCKET_ENV: &str = "SQLITE_RELAY_SOCKET";

/// Default number of requests allowed to wait in the worker queue.
pub const DEFAULT_MAX_PENDING: usize = 64;

/// Default socket path.
///
/// Tries, in order:
/// 1. SQLITE_RELAY_SOCKET env var
/// 2. ~/.sqlite-relay/relay.sock
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(SOCKET_ENV) {
        return PathBuf::from(shellexpand::tilde(&path).to_string());
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sqlite-relay")
        .join("relay.sock")
}

/// Runtime settings shared by the worker and its transports.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// Bounded capacity of the worker's inbound queue
    pub max_pending: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl RelayConfig {
    /// Override the socket path; `~` is expanded.
    pub fn with_socket(mut self, socket: impl AsRef<str>) -> Self {
        self.socket_path = PathBuf::from(shellexpand::tilde(socket.as_ref()).to_string());
        self
    }

    /// Override the queue capacity (clamped to at least 1).
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Pid file written next to the socket in background mode.
    pub fn pid_file(&self) -> PathBuf {
        let mut path = self.socket_path.clone().into_os_string();
        path.push(".pid");
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_socket_expands_tilde() {
        let config = RelayConfig::default().with_socket("~/relay.sock");
        assert!(!config.socket_path.to_string_lossy().starts_with('~'));
        assert!(config.socket_path.ends_with("relay.sock"));
    }

    #[test]
    fn test_pid_file_next_to_socket() {
        let config = RelayConfig::default().with_socket("/tmp/relay.sock");
        assert_eq!(config.pid_file(), PathBuf::from("/tmp/relay.sock.pid"));
    }

    #[test]
    fn test_max_pending_clamped() {
        let config = RelayConfig::default().with_max_pending(0);
        assert_eq!(config.max_pending, 1);
    }
}
