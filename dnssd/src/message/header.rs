use std::fmt;

use super::reader::Reader;
use super::writer::Writer;
use super::*;
use shared::error::*;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available
const HEADER_BIT_Z: u16 = 1 << 6; // reserved, zero on transmission
const HEADER_BIT_AD: u16 = 1 << 5; // authentic data
const HEADER_BIT_CD: u16 = 1 << 4; // checking disabled

const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0xF;
const RCODE_MASK: u16 = 0xF;

/// The fixed 12-byte DNS message header.
///
/// The section counts are owned by [`Message`](super::Message), which keeps
/// them equal to the number of entries in each section.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub op_code: OpCode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub zero: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub rcode: RCode,

    pub(crate) questions: u16,
    pub(crate) answers: u16,
    pub(crate) authorities: u16,
    pub(crate) additionals: u16,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = vec![];
        if self.response {
            flags.push("qr");
        }
        if self.authoritative {
            flags.push("aa");
        }
        if self.truncated {
            flags.push("tc");
        }
        if self.recursion_desired {
            flags.push("rd");
        }
        if self.recursion_available {
            flags.push("ra");
        }
        if self.authentic_data {
            flags.push("ad");
        }
        if self.checking_disabled {
            flags.push("cd");
        }
        write!(
            f,
            "opcode: {}, status: {}, id: {}, flags: {}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.op_code,
            self.rcode,
            self.id,
            flags.join(" "),
            self.questions,
            self.answers,
            self.authorities,
            self.additionals,
        )
    }
}

impl Header {
    /// A query header: QR clear, every flag zero, every count zero.
    pub fn new_request() -> Self {
        Self::default()
    }

    /// An mDNS response header: QR and AA set, everything else zero.
    pub fn new_response() -> Self {
        Self {
            response: true,
            authoritative: true,
            ..Default::default()
        }
    }

    pub fn is_query(&self) -> bool {
        !self.response
    }

    /// mDNS responses are always authoritative (RFC 6762 section 18.4).
    pub fn is_response(&self) -> bool {
        self.response && self.authoritative
    }

    pub fn question_count(&self) -> u16 {
        self.questions
    }

    pub fn answer_count(&self) -> u16 {
        self.answers
    }

    pub fn authority_count(&self) -> u16 {
        self.authorities
    }

    pub fn additional_count(&self) -> u16 {
        self.additionals
    }

    pub(crate) fn bits(&self) -> u16 {
        let mut bits = ((self.op_code as u16 & OPCODE_MASK) << OPCODE_SHIFT)
            | (u8::from(self.rcode) as u16 & RCODE_MASK);
        for (set, bit) in [
            (self.response, HEADER_BIT_QR),
            (self.authoritative, HEADER_BIT_AA),
            (self.truncated, HEADER_BIT_TC),
            (self.recursion_desired, HEADER_BIT_RD),
            (self.recursion_available, HEADER_BIT_RA),
            (self.zero, HEADER_BIT_Z),
            (self.authentic_data, HEADER_BIT_AD),
            (self.checking_disabled, HEADER_BIT_CD),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    pub(crate) fn pack(&self, w: &mut Writer) {
        w.write_u16(self.id);
        w.write_u16(self.bits());
        w.write_u16(self.questions);
        w.write_u16(self.answers);
        w.write_u16(self.authorities);
        w.write_u16(self.additionals);
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        if r.remaining() < HEADER_LEN {
            return Err(Error::ErrUnexpectedEof);
        }
        let id = r.read_u16()?;
        let bits = r.read_u16()?;
        Ok(Header {
            id,
            response: bits & HEADER_BIT_QR != 0,
            op_code: ((bits >> OPCODE_SHIFT) & OPCODE_MASK) as OpCode,
            authoritative: bits & HEADER_BIT_AA != 0,
            truncated: bits & HEADER_BIT_TC != 0,
            recursion_desired: bits & HEADER_BIT_RD != 0,
            recursion_available: bits & HEADER_BIT_RA != 0,
            zero: bits & HEADER_BIT_Z != 0,
            authentic_data: bits & HEADER_BIT_AD != 0,
            checking_disabled: bits & HEADER_BIT_CD != 0,
            rcode: RCode::from((bits & RCODE_MASK) as u8),
            questions: r.read_u16()?,
            answers: r.read_u16()?,
            authorities: r.read_u16()?,
            additionals: r.read_u16()?,
        })
    }
}
