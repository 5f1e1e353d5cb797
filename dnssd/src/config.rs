//! Configuration for an mDNS browsing session.
//!
//! ```rust
//! use dnssd::MdnsConfig;
//! use std::time::Duration;
//!
//! let config = MdnsConfig::default()
//!     .with_query_timeout(Duration::from_secs(5))
//!     .with_enable_ipv6(false);
//! assert_eq!(config.multicast_port, 5353);
//! ```

use std::time::Duration;

use shared::ifaces::Interface;

use crate::proto::MDNS_PORT;
use crate::query::DEFAULT_DOMAIN;

/// Default time a query collects answers when it carries no timeout (3 seconds).
pub(crate) const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Default receive buffer per listener: the largest mDNS message RFC 6762
/// allows over multicast (section 17).
pub(crate) const DEFAULT_READ_BUFFER_SIZE: usize = 9000;

/// Configuration for a [`Client`](crate::Client).
///
/// Built with the `with_*` methods on top of [`MdnsConfig::default()`].
#[derive(Clone, Debug)]
pub struct MdnsConfig {
    /// How long a query collects responses when the query sets no timeout.
    ///
    /// Default: 3 seconds
    pub query_timeout: Duration,

    /// Domain appended to service names that lack one.
    ///
    /// Default: `local`
    pub domain: String,

    /// UDP port the listeners bind and send to.
    ///
    /// Default: 5353. Tests may use a distinct port to stay off the real
    /// mDNS traffic.
    pub multicast_port: u16,

    /// Open listeners on IPv4 addresses (group 224.0.0.251).
    pub enable_ipv4: bool,

    /// Open listeners on IPv6 addresses (group ff02::fb).
    pub enable_ipv6: bool,

    /// Deliver our own multicast packets back to us.
    ///
    /// Default: true
    pub multicast_loopback: bool,

    /// Receive buffer per listener, at least a DNS header (12 bytes).
    ///
    /// Default: 9000 bytes
    pub read_buffer_size: usize,

    /// Interfaces to listen on. When `None`, every up, multicast capable,
    /// non-loopback, non-virtual interface is used.
    pub interfaces: Option<Vec<Interface>>,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            domain: DEFAULT_DOMAIN.to_owned(),
            multicast_port: MDNS_PORT,
            enable_ipv4: true,
            enable_ipv6: true,
            multicast_loopback: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            interfaces: None,
        }
    }
}

impl MdnsConfig {
    /// Create a new configuration with default values.
    ///
    /// Equivalent to [`MdnsConfig::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout applied to queries that carry none.
    ///
    /// ```rust
    /// use dnssd::MdnsConfig;
    /// use std::time::Duration;
    ///
    /// let config = MdnsConfig::default()
    ///     .with_query_timeout(Duration::from_millis(1500));
    /// assert_eq!(config.query_timeout, Duration::from_millis(1500));
    /// ```
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_multicast_port(mut self, port: u16) -> Self {
        self.multicast_port = port;
        self
    }

    pub fn with_enable_ipv4(mut self, enable: bool) -> Self {
        self.enable_ipv4 = enable;
        self
    }

    pub fn with_enable_ipv6(mut self, enable: bool) -> Self {
        self.enable_ipv6 = enable;
        self
    }

    pub fn with_multicast_loopback(mut self, loopback: bool) -> Self {
        self.multicast_loopback = loopback;
        self
    }

    /// Set the per-listener receive buffer size.
    ///
    /// [`Client::start`](crate::Client::start) rejects sizes smaller than a
    /// DNS header with [`Error::ErrBufferShort`](shared::error::Error::ErrBufferShort).
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Restrict the session to the given interfaces.
    ///
    /// An empty list makes [`Client::start`](crate::Client::start) fail with
    /// [`Error::ErrNoInterface`](shared::error::Error::ErrNoInterface).
    pub fn with_interfaces(mut self, interfaces: Vec<Interface>) -> Self {
        self.interfaces = Some(interfaces);
        self
    }

    /// Whether listeners should be opened for addresses of this family.
    pub(crate) fn accepts(&self, iface: &Interface) -> bool {
        if iface.is_ipv4() {
            self.enable_ipv4
        } else {
            self.enable_ipv6
        }
    }
}
