use std::fmt;

use super::reader::Reader;
use super::writer::Writer;
use super::*;
use shared::error::Result;

/// A question is a DNS query: a name, a type and a class.
///
/// In mDNS the top bit of the class field is the QU bit, asking for a
/// unicast rather than multicast response. It is kept out of `class`.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Question {
    pub name: String,
    pub typ: DnsType,
    pub class: DnsClass,
    pub unicast_response: bool,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.\t{}\t{}", self.name, self.class, self.typ)?;
        if self.unicast_response {
            write!(f, "\tQU")?;
        }
        Ok(())
    }
}

impl Question {
    /// A multicast-response question in class IN.
    pub fn new(name: impl Into<String>, typ: DnsType) -> Self {
        Self {
            name: name.into(),
            typ,
            class: DNSCLASS_INET,
            unicast_response: false,
        }
    }

    pub fn with_unicast_response(mut self, unicast_response: bool) -> Self {
        self.unicast_response = unicast_response;
        self
    }

    /// Case-insensitive name comparison (RFC 1035 section 2.3.3).
    pub fn is_name(&self, name: &str) -> bool {
        names_equal(&self.name, name)
    }

    /// Same name (ignoring case), type and class.
    pub fn equal(&self, other: &Question) -> bool {
        self.is_name(&other.name) && self.typ == other.typ && self.class == other.class
    }

    pub(crate) fn pack(&self, w: &mut Writer) -> Result<()> {
        w.write_name(&self.name)?;
        w.write_u16(self.typ.into());
        w.write_u16(self.class.with_flag(self.unicast_response));
        Ok(())
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.read_name()?;
        let typ = DnsType::from(r.read_u16()?);
        let (class, unicast_response) = DnsClass::split_flag(r.read_u16()?);
        Ok(Question {
            name,
            typ,
            class,
            unicast_response,
        })
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        self.pack(&mut w)?;
        Ok(w.finish())
    }
}
