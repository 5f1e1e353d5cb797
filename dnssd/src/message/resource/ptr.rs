use std::fmt;

use super::*;

/// A PTR record: a pointer to another domain name.
///
/// In DNS-SD the owner name is a service type and `domain_name` is one
/// instance of it.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct PtrResource {
    pub domain_name: String,
}

impl fmt::Display for PtrResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.domain_name)
    }
}

impl PtrResource {
    pub(crate) fn pack(&self, w: &mut Writer) -> Result<()> {
        w.write_name(&self.domain_name)
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        Ok(PtrResource {
            domain_name: r.read_name()?,
        })
    }
}
