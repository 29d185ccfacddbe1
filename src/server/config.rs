//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8081;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Per-connection outbound queue length; a full queue drops the message
    pub send_queue_capacity: usize,

    /// Maximum time a single WebSocket write may take before the connection
    /// is treated as dead
    pub write_timeout: Duration,

    /// Idle timeout (disconnect if no frame received, pongs included;
    /// zero disables it)
    pub idle_timeout: Duration,

    /// Interval between server pings (zero disables pings)
    pub ping_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            send_queue_capacity: 256,
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue length (at least 1)
    pub fn send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity.max(1);
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Ping period, or `None` when pings are disabled
    pub fn ping_period(&self) -> Option<Duration> {
        (!self.ping_interval.is_zero()).then_some(self.ping_interval)
    }

    /// Idle limit, or `None` when idle connections are never dropped
    pub fn idle_limit(&self) -> Option<Duration> {
        (!self.idle_timeout.is_zero()).then_some(self.idle_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.send_queue_capacity, 256);
        assert!(config.ping_interval < config.idle_timeout);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = ServerConfig::default().send_queue_capacity(0);

        assert_eq!(config.send_queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .send_queue_capacity(64)
            .write_timeout(Duration::from_secs(2))
            .idle_timeout(Duration::from_secs(30))
            .ping_interval(Duration::from_secs(5));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.send_queue_capacity, 64);
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.ping_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_durations_disable_timers() {
        let config = ServerConfig::default()
            .ping_interval(Duration::ZERO)
            .idle_timeout(Duration::ZERO);

        assert_eq!(config.ping_period(), None);
        assert_eq!(config.idle_limit(), None);

        let config = ServerConfig::default();
        assert_eq!(config.ping_period(), Some(Duration::from_secs(30)));
        assert_eq!(config.idle_limit(), Some(Duration::from_secs(90)));
    }
}
