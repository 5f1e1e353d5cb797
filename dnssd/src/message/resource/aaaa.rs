use std::fmt;
use std::net::Ipv6Addr;

use super::*;

/// An AAAA record: one IPv6 address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AaaaResource {
    pub aaaa: Ipv6Addr,
}

impl Default for AaaaResource {
    fn default() -> Self {
        Self {
            aaaa: Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl fmt::Display for AaaaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.aaaa)
    }
}

impl AaaaResource {
    pub(crate) fn pack(&self, w: &mut Writer) {
        w.write_bytes(&self.aaaa.octets());
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(r.read_bytes(16)?);
        Ok(AaaaResource {
            aaaa: Ipv6Addr::from(octets),
        })
    }
}
