//! Multicast-capable interface enumeration.
//!
//! mDNS listeners are bound per (interface, address) pair. This module lists
//! the pairs that are worth binding: interfaces that are up, support
//! multicast, are not loopback and are not virtual or bridge devices.

use std::fmt;
use std::net::IpAddr;

use crate::error::Result;

/// Name prefixes of virtual, tunnel and bridge devices that never carry mDNS
/// traffic for the physical link.
const VIRTUAL_PREFIXES: &[&str] = &[
    "docker", "veth", "br-", "virbr", "vmnet", "vboxnet", "lxcbr", "lxdbr", "cni", "flannel",
    "cali", "vEthernet", "utun", "awdl", "llw", "bridge", "zt",
];

/// A network interface paired with one of its bindable unicast addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interface {
    /// OS interface name, e.g. `eth0`.
    pub name: String,
    /// OS interface index, used to scope IPv6 multicast.
    pub index: u32,
    /// Unicast address assigned to the interface.
    pub addr: IpAddr,
}

impl Interface {
    pub fn new(name: impl Into<String>, index: u32, addr: IpAddr) -> Self {
        Self {
            name: name.into(),
            index,
            addr,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ({})", self.name, self.index, self.addr)
    }
}

/// One raw entry reported by the OS before filtering.
#[derive(Debug, Clone)]
pub struct InterfaceCandidate {
    pub name: String,
    pub index: u32,
    pub addr: Option<IpAddr>,
    pub up: bool,
    pub loopback: bool,
    pub multicast: bool,
}

/// Reports whether the name belongs to a virtual or bridge device.
pub fn is_virtual(name: &str) -> bool {
    VIRTUAL_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Keeps the candidates that can host an mDNS listener.
pub fn filter_candidates<I>(candidates: I) -> Vec<Interface>
where
    I: IntoIterator<Item = InterfaceCandidate>,
{
    candidates
        .into_iter()
        .filter_map(|c| {
            if !c.up || c.loopback || !c.multicast || is_virtual(&c.name) {
                return None;
            }
            let addr = c.addr?;
            if addr.is_loopback() || addr.is_unspecified() || addr.is_multicast() {
                return None;
            }
            Some(Interface::new(c.name, c.index, addr))
        })
        .collect()
}

/// Lists every usable (interface, address) pair on this host.
#[cfg(unix)]
pub fn list_multicast_interfaces() -> Result<Vec<Interface>> {
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::{InterfaceFlags, if_nametoindex};
    use std::net::{SocketAddrV4, SocketAddrV6};

    let addrs = getifaddrs().map_err(std::io::Error::from)?;
    let candidates = addrs.map(|ifa| {
        let addr = ifa.address.as_ref().and_then(|storage| {
            if let Some(sin) = storage.as_sockaddr_in() {
                Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()))
            } else {
                storage
                    .as_sockaddr_in6()
                    .map(|sin6| IpAddr::V6(*SocketAddrV6::from(*sin6).ip()))
            }
        });
        let index = if_nametoindex(ifa.interface_name.as_str()).unwrap_or(0);
        InterfaceCandidate {
            index,
            addr,
            up: ifa.flags.contains(InterfaceFlags::IFF_UP),
            loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
            multicast: ifa.flags.contains(InterfaceFlags::IFF_MULTICAST),
            name: ifa.interface_name,
        }
    });

    let ifaces = filter_candidates(candidates);
    log::debug!("found {} multicast capable interface addresses", ifaces.len());
    Ok(ifaces)
}

/// Lists every usable (interface, address) pair on this host.
#[cfg(not(unix))]
pub fn list_multicast_interfaces() -> Result<Vec<Interface>> {
    log::warn!("interface enumeration is not supported on this platform");
    Ok(vec![])
}
