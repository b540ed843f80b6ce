//! Broadcast server configuration

use std::net::SocketAddr;

/// Broadcast server configuration options
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Address to bind to; port 0 selects an ephemeral port
    pub bind_addr: SocketAddr,

    /// Prefix every payload with a little-endian u16 length
    pub write_length_prefix: bool,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Capacity of the new-subscriber event channel
    pub event_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".parse().unwrap(),
            write_length_prefix: false,
            max_subscribers: 0, // Unlimited
            tcp_nodelay: true,  // Important for low latency
            event_capacity: 16,
        }
    }
}

impl BroadcastConfig {
    /// Create a new config with a custom bind address
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

    /// Enable or disable the length prefix
    pub fn write_length_prefix(mut self, enabled: bool) -> Self {
        self.write_length_prefix = enabled;
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the event channel capacity (minimum 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
