
pub(crate) mod header;
mod packer;
pub(crate) mod question;
pub(crate) mod reader;
pub(crate) mod resource;
pub(crate) mod writer;

use std::fmt;
use std::net::SocketAddr;

use regex::Regex;

pub use header::Header;
pub use question::Question;
pub use resource::{
    AResource, AaaaResource, NsecResource, PtrResource, Resource, ResourceBody, ResourceHeader,
    SrvResource, TxtResource,
};

use packer::UINT16LEN;
use reader::Reader;
use writer::Writer;

use shared::error::*;

// Message formats

/// A Type is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DnsType {
    // ResourceHeader.Type and Question.Type
    A,
    Ns,
    Cname,
    Ptr,
    Hinfo,
    Mx,
    Txt,
    Aaaa,
    Srv,
    Opt,
    Nsec,

    // Question.Type
    Axfr,
    Any,

    Unsupported(u16),

    #[default]
    None,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            2 => DnsType::Ns,
            5 => DnsType::Cname,
            12 => DnsType::Ptr,
            13 => DnsType::Hinfo,
            15 => DnsType::Mx,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            41 => DnsType::Opt,
            47 => DnsType::Nsec,

            // Question.Type
            252 => DnsType::Axfr,
            255 => DnsType::Any,

            0 => DnsType::None,
            _ => DnsType::Unsupported(v),
        }
    }
}

impl From<DnsType> for u16 {
    fn from(t: DnsType) -> Self {
        match t {
            DnsType::A => 1,
            DnsType::Ns => 2,
            DnsType::Cname => 5,
            DnsType::Ptr => 12,
            DnsType::Hinfo => 13,
            DnsType::Mx => 15,
            DnsType::Txt => 16,
            DnsType::Aaaa => 28,
            DnsType::Srv => 33,
            DnsType::Opt => 41,
            DnsType::Nsec => 47,
            DnsType::Axfr => 252,
            DnsType::Any => 255,
            DnsType::Unsupported(v) => v,
            DnsType::None => 0,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ns => "NS",
            DnsType::Cname => "CNAME",
            DnsType::Ptr => "PTR",
            DnsType::Hinfo => "HINFO",
            DnsType::Mx => "MX",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Opt => "OPT",
            DnsType::Nsec => "NSEC",
            DnsType::Axfr => "AXFR",
            DnsType::Any => "ANY",
            DnsType::Unsupported(v) => return write!(f, "TYPE{v}"),
            DnsType::None => "NONE",
        };
        write!(f, "{s}")
    }
}

/// DNS class of a question or resource record.
///
/// Only `DNSCLASS_INET` is used by mDNS. The top bit of the class field on
/// the wire is a flag (QU in questions, cache-flush in records) and is never
/// part of this value.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DnsClass(pub u16);

/// Internet class (IN).
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Any class (*), only meaningful in questions.
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

// The class-field bit used for the QU / cache-flush flag.
const CLASS_FLAG_BIT: u16 = 1 << 15;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DNSCLASS_INET => write!(f, "IN"),
            DNSCLASS_ANY => write!(f, "ANY"),
            _ => write!(f, "CLASS{}", self.0),
        }
    }
}

impl DnsClass {
    /// Splits a wire class field into the class and its flag bit.
    pub(crate) fn split_flag(raw: u16) -> (DnsClass, bool) {
        (DnsClass(raw & !CLASS_FLAG_BIT), raw & CLASS_FLAG_BIT != 0)
    }

    /// The wire class field with the flag bit applied.
    pub(crate) fn with_flag(&self, flag: bool) -> u16 {
        let class = self.0 & !CLASS_FLAG_BIT;
        if flag { class | CLASS_FLAG_BIT } else { class }
    }
}

/// An OpCode is a DNS operation code (4 bits).
pub type OpCode = u8;

/// An RCode is a DNS response status code (4 bits).
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RCode {
    #[default]
    Success,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Unsupported(u8),
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported(v),
        }
    }
}

impl From<RCode> for u8 {
    fn from(r: RCode) -> Self {
        match r {
            RCode::Success => 0,
            RCode::FormatError => 1,
            RCode::ServerFailure => 2,
            RCode::NameError => 3,
            RCode::NotImplemented => 4,
            RCode::Refused => 5,
            RCode::Unsupported(v) => v,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "NOERROR",
            RCode::FormatError => "FORMERR",
            RCode::ServerFailure => "SERVFAIL",
            RCode::NameError => "NXDOMAIN",
            RCode::NotImplemented => "NOTIMP",
            RCode::Refused => "REFUSED",
            RCode::Unsupported(v) => return write!(f, "RCODE{v}"),
        };
        write!(f, "{s}")
    }
}

// HEADER_LEN is the length (in bytes) of a DNS header.
//
// A header is comprised of 6 uint16s and no padding.
pub(crate) const HEADER_LEN: usize = 6 * UINT16LEN;

/// Compares two domain names ignoring ASCII case and a trailing dot.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// A DNS message: header plus question, answer, authority and additional sections.
///
/// A message parsed from the wire remembers its bytes and serializes back to
/// them verbatim until it is modified.
#[derive(Default, Debug, Clone)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Resource>,
    authorities: Vec<Resource>,
    additionals: Vec<Resource>,
    from: Option<SocketAddr>,
    raw: Option<Vec<u8>>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; {}", self.header)?;
        if let Some(from) = self.from {
            writeln!(f, ";; FROM: {from}")?;
        }
        writeln!(f, ";; QUESTION SECTION:")?;
        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }
        for (title, section) in [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authorities),
            ("ADDITIONAL", &self.additionals),
        ] {
            if section.is_empty() {
                continue;
            }
            writeln!(f, ";; {title} SECTION:")?;
            for r in section {
                writeln!(f, "{r}")?;
            }
        }
        Ok(())
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Message {
    /// An empty message with the given header flags; counts start at zero.
    pub fn new(header: Header) -> Self {
        Self {
            header: Header {
                questions: 0,
                answers: 0,
                authorities: 0,
                additionals: 0,
                ..header
            },
            ..Default::default()
        }
    }

    pub fn new_request() -> Self {
        Self::new(Header::new_request())
    }

    pub fn new_response() -> Self {
        Self::new(Header::new_response())
    }

    /// Parses a full message. Any failing entry fails the whole message.
    pub fn parse(msg: &[u8]) -> Result<Self> {
        let mut r = Reader::new(msg);
        let header = Header::unpack(&mut r)?;

        let mut questions = Vec::with_capacity(header.questions as usize);
        for index in 0..header.questions as usize {
            let q = Question::unpack(&mut r).map_err(|err| section_err("question", index, err))?;
            questions.push(q);
        }
        let answers = unpack_section(&mut r, "answer", header.answers)?;
        let authorities = unpack_section(&mut r, "authority", header.authorities)?;
        let additionals = unpack_section(&mut r, "additional", header.additionals)?;

        Ok(Self {
            header,
            questions,
            answers,
            authorities,
            additionals,
            from: None,
            raw: Some(msg.to_vec()),
        })
    }

    /// Parses a received datagram and tags it with its sender.
    pub fn parse_from(msg: &[u8], from: SocketAddr) -> Result<Self> {
        let mut m = Self::parse(msg)?;
        m.from = Some(from);
        Ok(m)
    }

    /// Wire bytes of the message.
    ///
    /// An unmodified parsed message returns its original bytes verbatim.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }

        let mut w = Writer::new();
        self.header.pack(&mut w);
        for question in &self.questions {
            question.pack(&mut w)?;
        }
        for record in self.records() {
            record.pack(&mut w)?;
        }
        Ok(w.finish())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable header flags. Section counts stay under the message's control.
    pub fn header_mut(&mut self) -> &mut Header {
        self.raw = None;
        &mut self.header
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Resource] {
        &self.answers
    }

    pub fn authorities(&self) -> &[Resource] {
        &self.authorities
    }

    pub fn additionals(&self) -> &[Resource] {
        &self.additionals
    }

    /// Answer, authority and additional records, in that order.
    pub fn records(&self) -> impl Iterator<Item = &Resource> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
    }

    /// The address a received message came from.
    pub fn from(&self) -> Option<SocketAddr> {
        self.from
    }

    pub fn set_from(&mut self, from: SocketAddr) {
        self.from = Some(from);
    }

    pub fn is_query(&self) -> bool {
        self.header.is_query()
    }

    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    pub fn add_question(&mut self, question: Question) -> Result<()> {
        if self.header.questions == u16::MAX {
            return Err(Error::ErrTooManyQuestions);
        }
        self.raw = None;
        self.questions.push(question);
        self.header.questions += 1;
        Ok(())
    }

    pub fn add_answer(&mut self, record: Resource) -> Result<()> {
        if self.header.answers == u16::MAX {
            return Err(Error::ErrTooManyAnswers);
        }
        self.raw = None;
        self.answers.push(record);
        self.header.answers += 1;
        Ok(())
    }

    pub fn add_authority(&mut self, record: Resource) -> Result<()> {
        if self.header.authorities == u16::MAX {
            return Err(Error::ErrTooManyAuthorities);
        }
        self.raw = None;
        self.authorities.push(record);
        self.header.authorities += 1;
        Ok(())
    }

    pub fn add_additional(&mut self, record: Resource) -> Result<()> {
        if self.header.additionals == u16::MAX {
            return Err(Error::ErrTooManyAdditionals);
        }
        self.raw = None;
        self.additionals.push(record);
        self.header.additionals += 1;
        Ok(())
    }

    /// Header equality plus order-independent equality of every section.
    pub fn equal(&self, other: &Message) -> bool {
        self.header == other.header
            && same_set(&self.questions, &other.questions, Question::equal)
            && same_set(&self.answers, &other.answers, Resource::equal)
            && same_set(&self.authorities, &other.authorities, Resource::equal)
            && same_set(&self.additionals, &other.additionals, Resource::equal)
    }

    /// Reports whether this message is a response to `query`.
    pub fn answers_query(&self, query: &Message) -> bool {
        is_query_answer(query, self)
    }

    /// First record whose name equals `name`, ignoring case.
    pub fn lookup_by_name(&self, name: &str) -> Option<&Resource> {
        self.records().find(|r| r.is_name(name))
    }

    /// First record whose name starts with `prefix`, ignoring case.
    pub fn lookup_by_name_prefix(&self, prefix: &str) -> Option<&Resource> {
        let re = Regex::new(&format!("(?i)^{}", regex::escape(prefix))).ok()?;
        self.lookup_by_regex(&re)
    }

    /// First record whose name ends with `suffix`, ignoring case.
    pub fn lookup_by_name_suffix(&self, suffix: &str) -> Option<&Resource> {
        let re = Regex::new(&format!("(?i){}$", regex::escape(suffix))).ok()?;
        self.lookup_by_regex(&re)
    }

    /// First record whose name matches `pattern`.
    pub fn lookup_by_name_regex(&self, pattern: &str) -> Result<Option<&Resource>> {
        let re = Regex::new(pattern).map_err(|err| Error::ErrInvalidPattern(err.to_string()))?;
        Ok(self.lookup_by_regex(&re))
    }

    pub fn lookup_by_regex(&self, re: &Regex) -> Option<&Resource> {
        self.records().find(|r| re.is_match(r.name()))
    }
}

/// Reports whether `response` answers `query`.
///
/// The response must be an authoritative response, IDs must match when both
/// are non-zero, and at least one question must be matched by at least one
/// answer, authority or additional record on name (ignoring case), class and
/// type (or the question type is ANY).
pub fn is_query_answer(query: &Message, response: &Message) -> bool {
    if !response.is_response() {
        return false;
    }
    if query.header.id != 0 && response.header.id != 0 && query.header.id != response.header.id
    {
        return false;
    }
    query.questions.iter().any(|q| {
        response.records().any(|r| {
            r.is_name(&q.name) && r.class() == q.class && (q.typ == DnsType::Any || r.typ() == q.typ)
        })
    })
}

fn unpack_section(r: &mut Reader<'_>, section: &'static str, count: u16) -> Result<Vec<Resource>> {
    let mut records = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        let record = Resource::unpack(r).map_err(|err| section_err(section, index, err))?;
        records.push(record);
    }
    Ok(records)
}

fn section_err(section: &'static str, index: usize, err: Error) -> Error {
    Error::ErrSectionParse {
        section,
        index,
        source: Box::new(err),
    }
}

// Order-independent equality: same length and every element of each side
// has an equal element on the other.
fn same_set<T>(a: &[T], b: &[T], eq: fn(&T, &T) -> bool) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| eq(x, y)))
        && b.iter().all(|y| a.iter().any(|x| eq(x, y)))
}
