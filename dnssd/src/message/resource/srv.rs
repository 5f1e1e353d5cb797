use std::fmt;

use super::*;

/// An SRV record (RFC 2782): where an instance of a service can be reached.
///
/// `service` and `proto` are split out of the owner name, which has the form
/// `[instance.]_service._proto.domain`.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct SrvResource {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
    pub service: String,
    pub proto: String,
}

impl fmt::Display for SrvResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}.",
            self.priority, self.weight, self.port, self.target
        )
    }
}

impl SrvResource {
    pub(crate) fn pack(&self, w: &mut Writer) -> Result<()> {
        w.write_u16(self.priority);
        w.write_u16(self.weight);
        w.write_u16(self.port);
        w.write_name(&self.target)
    }

    pub(crate) fn unpack(name: &str, r: &mut Reader<'_>) -> Result<Self> {
        let priority = r.read_u16()?;
        let weight = r.read_u16()?;
        let port = r.read_u16()?;
        let target = r.read_name()?;
        let (service, proto) = split_service_name(name);
        Ok(SrvResource {
            priority,
            weight,
            port,
            target,
            service,
            proto,
        })
    }
}

/// Finds the `_service._proto` label pair in an owner name.
///
/// Returns empty strings when the name carries no such pair.
pub(crate) fn split_service_name(name: &str) -> (String, String) {
    let labels: Vec<&str> = name.split('.').collect();
    labels
        .windows(2)
        .find(|pair| pair[0].starts_with('_') && pair[1].starts_with('_'))
        .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
        .unwrap_or_default()
}
