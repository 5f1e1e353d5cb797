//! Socket utilities for mDNS.
//!
//! [`MulticastSocket`] builds a UDP socket that is bound to the mDNS port,
//! joined to the mDNS group on one interface and ready for tokio.
//!
//! ```rust,ignore
//! use dnssd::MulticastSocket;
//! use dnssd::ifaces::Interface;
//!
//! let iface = Interface::new("eth0", 2, "192.168.1.10".parse()?);
//! let std_socket = MulticastSocket::new().with_interface(iface).into_std()?;
//! let socket = tokio::net::UdpSocket::from_std(std_socket)?;
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket};

use shared::ifaces::Interface;
use socket2::{Domain, Protocol, Socket, Type};

use crate::proto::{MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};

/// A builder for multicast UDP sockets suitable for mDNS.
///
/// The resulting socket has `SO_REUSEADDR` (and `SO_REUSEPORT` where
/// supported) set, is non-blocking, and has joined the mDNS group for its
/// address family on the chosen interface. Outgoing multicast leaves through
/// that same interface.
#[derive(Debug, Clone)]
pub struct MulticastSocket {
    multicast_local_ipv4: Option<Ipv4Addr>,
    multicast_local_port: Option<u16>,
    interface: Option<Interface>,
    loopback: bool,
}

impl Default for MulticastSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl MulticastSocket {
    /// Creates a builder for an IPv4 socket on all interfaces, port 5353,
    /// with multicast loopback on.
    pub fn new() -> Self {
        Self {
            multicast_local_ipv4: None,
            multicast_local_port: None,
            interface: None,
            loopback: true,
        }
    }

    /// Overrides the IPv4 address the socket binds to.
    pub fn with_multicast_local_ipv4(mut self, multicast_local_ipv4: Ipv4Addr) -> Self {
        self.multicast_local_ipv4 = Some(multicast_local_ipv4);
        self
    }

    pub fn with_multicast_local_port(mut self, multicast_local_port: u16) -> Self {
        self.multicast_local_port = Some(multicast_local_port);
        self
    }

    /// Joins the group on `interface` only. The interface address also picks
    /// the address family of the socket.
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    fn port(&self) -> u16 {
        self.multicast_local_port.unwrap_or(MDNS_PORT)
    }

    /// The group address datagrams from this socket should be sent to.
    ///
    /// IPv6 destinations carry the interface index as scope id.
    pub fn destination(&self) -> SocketAddr {
        match &self.interface {
            Some(Interface {
                addr: IpAddr::V6(_),
                index,
                ..
            }) => SocketAddr::V6(SocketAddrV6::new(MDNS_MULTICAST_IPV6, self.port(), 0, *index)),
            _ => SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), self.port()),
        }
    }

    /// Converts this builder into a configured `std::net::UdpSocket`.
    ///
    /// # Errors
    ///
    /// Fails if creating the socket, setting an option, binding or joining
    /// the group fails.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        match self.interface.as_ref().map(|iface| (iface.addr, iface.index)) {
            Some((IpAddr::V6(_), index)) => self.into_std_v6(index),
            Some((IpAddr::V4(addr), _)) => self.into_std_v4(addr),
            None => self.into_std_v4(Ipv4Addr::UNSPECIFIED),
        }
    }

    fn into_std_v4(self, iface: Ipv4Addr) -> io::Result<UdpSocket> {
        let socket = new_socket(Domain::IPV4)?;

        let multicast_local_ip = if let Some(multicast_local_ipv4) = self.multicast_local_ipv4 {
            multicast_local_ipv4
        } else if cfg!(target_os = "linux") {
            MDNS_MULTICAST_IPV4
        } else {
            // Binding to the group address doesn't work on Mac/Win,
            // only 0.0.0.0 works fine, even 127.0.0.1 doesn't work
            Ipv4Addr::UNSPECIFIED
        };
        let multicast_local_addr = SocketAddr::new(IpAddr::V4(multicast_local_ip), self.port());
        socket.bind(&multicast_local_addr.into())?;

        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;
        if !iface.is_unspecified() {
            socket.set_multicast_if_v4(&iface)?;
        }
        socket.set_multicast_loop_v4(self.loopback)?;

        log::debug!("bound {multicast_local_addr} on {iface}");
        Ok(socket.into())
    }

    fn into_std_v6(self, index: u32) -> io::Result<UdpSocket> {
        let socket = new_socket(Domain::IPV6)?;
        socket.set_only_v6(true)?;

        let local_addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), self.port());
        socket.bind(&local_addr.into())?;

        socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, index)?;
        socket.set_multicast_if_v6(index)?;
        socket.set_multicast_loop_v6(self.loopback)?;

        log::debug!("bound {local_addr} on interface #{index}");
        Ok(socket.into())
    }
}

fn new_socket(domain: Domain) -> io::Result<Socket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    // Enable address reuse for multiple processes
    socket.set_reuse_address(true)?;

    // Enable port reuse on supported platforms
    #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
    socket.set_reuse_port(true)?;

    socket.set_nonblocking(true)?;
    Ok(socket)
}
