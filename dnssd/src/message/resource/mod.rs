pub(crate) mod a;
pub(crate) mod aaaa;
pub(crate) mod nsec;
pub(crate) mod ptr;
pub(crate) mod srv;
pub(crate) mod txt;

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

pub use a::AResource;
pub use aaaa::AaaaResource;
pub use nsec::NsecResource;
pub use ptr::PtrResource;
pub use srv::SrvResource;
pub use txt::TxtResource;

use super::reader::{PacketContext, Reader};
use super::writer::Writer;
use super::*;
use shared::error::*;

/// Header for a DNS resource record.
///
/// # Wire Format
///
/// ```text
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      NAME                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |CF|                  CLASS                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TTL                      |
/// |                                               |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                   RDLENGTH                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     RDATA                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// `CF` is the mDNS cache-flush bit (RFC 6762 section 10.2); it is tracked in
/// `cache_flush` and never part of `class`.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ResourceHeader {
    /// The domain name for which this resource record pertains.
    pub name: String,

    /// The type of DNS resource record.
    pub typ: DnsType,

    /// The class, almost always [`DNSCLASS_INET`].
    pub class: DnsClass,

    /// The record supersedes previously cached records of the same name/type/class.
    pub cache_flush: bool,

    /// Time to live in seconds.
    pub ttl: u32,
}

impl ResourceHeader {
    pub fn new(name: impl Into<String>, typ: DnsType, ttl: u32) -> Self {
        Self {
            name: name.into(),
            typ,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
        }
    }

    pub fn with_cache_flush(mut self, cache_flush: bool) -> Self {
        self.cache_flush = cache_flush;
        self
    }
}

/// Typed RDATA of a resource record.
///
/// Types without structured decoding stay [`ResourceBody::Unknown`] and keep
/// their raw bytes in the owning [`Resource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceBody {
    A(AResource),
    Aaaa(AaaaResource),
    Ptr(PtrResource),
    Srv(SrvResource),
    Txt(TxtResource),
    Nsec(NsecResource),
    Unknown,
}

impl ResourceBody {
    /// The record type this body encodes, if it is a typed body.
    pub fn real_type(&self) -> Option<DnsType> {
        match self {
            ResourceBody::A(_) => Some(DnsType::A),
            ResourceBody::Aaaa(_) => Some(DnsType::Aaaa),
            ResourceBody::Ptr(_) => Some(DnsType::Ptr),
            ResourceBody::Srv(_) => Some(DnsType::Srv),
            ResourceBody::Txt(_) => Some(DnsType::Txt),
            ResourceBody::Nsec(_) => Some(DnsType::Nsec),
            ResourceBody::Unknown => None,
        }
    }

    // Parses RDATA with a reader over the record's own data slice that still
    // resolves pointers against the enclosing packet.
    fn unpack(header: &ResourceHeader, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match header.typ {
            DnsType::A => ResourceBody::A(AResource::unpack(r)?),
            DnsType::Aaaa => ResourceBody::Aaaa(AaaaResource::unpack(r)?),
            DnsType::Ptr => ResourceBody::Ptr(PtrResource::unpack(r)?),
            DnsType::Srv => ResourceBody::Srv(SrvResource::unpack(&header.name, r)?),
            DnsType::Txt => ResourceBody::Txt(TxtResource::unpack(r)?),
            DnsType::Nsec => ResourceBody::Nsec(NsecResource::unpack(r)?),
            _ => ResourceBody::Unknown,
        })
    }

    // Returns None for bodies whose wire form is their raw data.
    fn pack(&self) -> Result<Option<Vec<u8>>> {
        let mut w = Writer::new();
        match self {
            ResourceBody::A(a) => a.pack(&mut w),
            ResourceBody::Aaaa(aaaa) => aaaa.pack(&mut w),
            ResourceBody::Ptr(ptr) => ptr.pack(&mut w)?,
            ResourceBody::Srv(srv) => srv.pack(&mut w)?,
            ResourceBody::Txt(txt) => txt.pack(&mut w)?,
            ResourceBody::Nsec(_) | ResourceBody::Unknown => return Ok(None),
        }
        Ok(Some(w.finish()))
    }
}

/// A DNS resource record: common header fields, the raw RDATA and its typed form.
#[derive(Clone, Debug)]
pub struct Resource {
    header: ResourceHeader,
    data: Vec<u8>,
    body: ResourceBody,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.\t{}\t{}\t{}\t{}",
            self.header.name,
            self.header.ttl,
            self.header.class,
            self.header.typ,
            self.content()
        )?;
        if self.header.cache_flush {
            write!(f, "\t; cache-flush")?;
        }
        Ok(())
    }
}

impl Resource {
    /// Builds a record from a typed body; the header type follows the body.
    pub fn new(mut header: ResourceHeader, body: ResourceBody) -> Result<Self> {
        if let Some(typ) = body.real_type() {
            header.typ = typ;
        }
        let data = body.pack()?.unwrap_or_default();
        Ok(Self { header, data, body })
    }

    /// Builds a record from raw RDATA, decoding it according to `header.typ`.
    ///
    /// The data is its own compression context, so it must not contain pointers.
    pub fn from_data(header: ResourceHeader, data: Vec<u8>) -> Result<Self> {
        let body = {
            let mut r = Reader::new(&data);
            ResourceBody::unpack(&header, &mut r)?
        };
        Ok(Self { header, data, body })
    }

    pub fn new_a(name: impl Into<String>, ttl: u32, addr: Ipv4Addr) -> Self {
        Self {
            header: ResourceHeader::new(name, DnsType::A, ttl),
            data: addr.octets().to_vec(),
            body: ResourceBody::A(AResource { a: addr }),
        }
    }

    pub fn new_aaaa(name: impl Into<String>, ttl: u32, addr: Ipv6Addr) -> Self {
        Self {
            header: ResourceHeader::new(name, DnsType::Aaaa, ttl),
            data: addr.octets().to_vec(),
            body: ResourceBody::Aaaa(AaaaResource { aaaa: addr }),
        }
    }

    pub fn new_ptr(
        name: impl Into<String>,
        ttl: u32,
        domain_name: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            ResourceHeader::new(name, DnsType::Ptr, ttl),
            ResourceBody::Ptr(PtrResource {
                domain_name: domain_name.into(),
            }),
        )
    }

    pub fn new_srv(
        name: impl Into<String>,
        ttl: u32,
        priority: u16,
        weight: u16,
        port: u16,
        target: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let (service, proto) = srv::split_service_name(&name);
        Self::new(
            ResourceHeader::new(name, DnsType::Srv, ttl),
            ResourceBody::Srv(SrvResource {
                priority,
                weight,
                port,
                target: target.into(),
                service,
                proto,
            }),
        )
    }

    pub fn new_txt(name: impl Into<String>, ttl: u32, txt: Vec<String>) -> Result<Self> {
        Self::new(
            ResourceHeader::new(name, DnsType::Txt, ttl),
            ResourceBody::Txt(TxtResource { txt }),
        )
    }

    pub fn header(&self) -> &ResourceHeader {
        &self.header
    }

    pub fn body(&self) -> &ResourceBody {
        &self.body
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn typ(&self) -> DnsType {
        self.header.typ
    }

    pub fn class(&self) -> DnsClass {
        self.header.class
    }

    pub fn cache_flush(&self) -> bool {
        self.header.cache_flush
    }

    pub fn ttl(&self) -> u32 {
        self.header.ttl
    }

    /// RDATA exactly as received (or as packed for built records).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Case-insensitive name comparison (RFC 1035 section 2.3.3).
    pub fn is_name(&self, name: &str) -> bool {
        names_equal(&self.header.name, name)
    }

    /// Human-readable RDATA.
    pub fn content(&self) -> String {
        match &self.body {
            ResourceBody::A(a) => a.to_string(),
            ResourceBody::Aaaa(aaaa) => aaaa.to_string(),
            ResourceBody::Ptr(ptr) => ptr.to_string(),
            ResourceBody::Srv(srv) => srv.to_string(),
            ResourceBody::Txt(txt) => txt.to_string(),
            ResourceBody::Nsec(_) | ResourceBody::Unknown => printable(&self.data),
        }
    }

    /// Content equality: same type, same name ignoring case, same rendered content.
    pub fn equal(&self, other: &Resource) -> bool {
        self.header.typ == other.header.typ
            && self.is_name(&other.header.name)
            && self.content() == other.content()
    }

    /// The full wire encoding, with names written uncompressed.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        self.pack(&mut w)?;
        Ok(w.finish())
    }

    pub(crate) fn pack(&self, w: &mut Writer) -> Result<()> {
        w.write_name(&self.header.name)?;
        w.write_u16(self.header.typ.into());
        w.write_u16(self.header.class.with_flag(self.header.cache_flush));
        w.write_u32(self.header.ttl);
        // Parsed RDATA may hold pointers into the original packet, so typed
        // bodies are re-encoded rather than copied.
        match self.body.pack()? {
            Some(data) => w.write_data(&data),
            None => w.write_data(&self.data),
        }
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        let name = r.read_name()?;
        let typ = DnsType::from(r.read_u16()?);
        let (class, cache_flush) = DnsClass::split_flag(r.read_u16()?);
        let ttl = r.read_u32()?;
        let length = r.read_u16()? as usize;
        let data = r.read_bytes(length)?;

        let header = ResourceHeader {
            name,
            typ,
            class,
            cache_flush,
            ttl,
        };
        let body = {
            let mut data_reader = Reader::with_context(data, r.context());
            ResourceBody::unpack(&header, &mut data_reader)?
        };

        Ok(Self {
            header,
            data: data.to_vec(),
            body,
        })
    }

    /// Parses one standalone record; `buf` is also its compression context.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Self::unpack(&mut Reader::new(buf))
    }

    /// Parses one record starting at `off` within `packet`.
    pub fn parse_at(packet: &[u8], off: usize) -> Result<Self> {
        let buf = packet.get(off..).ok_or(Error::ErrUnexpectedEof)?;
        Self::unpack(&mut Reader::with_context(buf, PacketContext::new(packet)))
    }
}

// Renders printable ASCII as-is and everything else as '.'.
fn printable(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b == b' ' || b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
