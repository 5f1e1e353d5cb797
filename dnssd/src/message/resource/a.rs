use std::fmt;
use std::net::Ipv4Addr;

use super::*;

/// An A record: one IPv4 address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AResource {
    pub a: Ipv4Addr,
}

impl Default for AResource {
    fn default() -> Self {
        Self {
            a: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl fmt::Display for AResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.a)
    }
}

impl AResource {
    pub(crate) fn pack(&self, w: &mut Writer) {
        w.write_bytes(&self.a.octets());
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        let b = r.read_bytes(4)?;
        Ok(AResource {
            a: Ipv4Addr::new(b[0], b[1], b[2], b[3]),
        })
    }
}
