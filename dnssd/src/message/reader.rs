use super::packer::*;
use shared::error::*;

// Compression pointers chain through the packet; this bounds the chain so a
// looping packet cannot recurse forever.
const MAX_POINTER_HOPS: usize = 16;

const LABEL_POINTER: u8 = 0xC0;

/// The full datagram that compression pointers are resolved against.
///
/// mDNS compression offsets are absolute positions in the packet, so every
/// reader created while parsing one message carries the same context, even
/// readers over a record's own RDATA slice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PacketContext<'a> {
    packet: &'a [u8],
}

impl<'a> PacketContext<'a> {
    pub(crate) fn new(packet: &'a [u8]) -> Self {
        Self { packet }
    }

    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.packet
    }
}

/// A forward-only cursor over a byte buffer.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    off: usize,
    ctx: PacketContext<'a>,
}

impl<'a> Reader<'a> {
    /// Reader over a whole packet; the packet is its own compression context.
    pub(crate) fn new(packet: &'a [u8]) -> Self {
        Self {
            buf: packet,
            off: 0,
            ctx: PacketContext::new(packet),
        }
    }

    /// Reader over a slice of a packet, resolving pointers against `ctx`.
    pub(crate) fn with_context(buf: &'a [u8], ctx: PacketContext<'a>) -> Self {
        Self { buf, off: 0, ctx }
    }

    pub(crate) fn context(&self) -> PacketContext<'a> {
        self.ctx
    }

    pub(crate) fn offset(&self) -> usize {
        self.off
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.off)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let (v, off) = unpack_uint8(self.buf, self.off)?;
        self.off = off;
        Ok(v)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let (v, off) = unpack_uint16(self.buf, self.off)?;
        self.off = off;
        Ok(v)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let (v, off) = unpack_uint32(self.buf, self.off)?;
        self.off = off;
        Ok(v)
    }

    /// Reads exactly `n` bytes, failing without consuming anything if fewer remain.
    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::ErrUnexpectedEof);
        }
        let b = &self.buf[self.off..self.off + n];
        self.off += n;
        Ok(b)
    }

    /// Reads a character string: one length byte followed by that many bytes.
    pub(crate) fn read_string(&mut self) -> Result<String> {
        let n = self.read_u8()? as usize;
        if n == 0 {
            return Ok(String::new());
        }
        let b = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(b).into_owned())
    }

    /// Reads character strings until a zero-length one or the end of the buffer.
    ///
    /// Running out of bytes between strings ends the sequence; running out
    /// before anything was read, or in the middle of a string, is an error.
    pub(crate) fn read_strings(&mut self) -> Result<Vec<String>> {
        let start = self.off;
        let mut strings = vec![];
        loop {
            if self.is_empty() && self.off > start {
                break;
            }
            let s = self.read_string()?;
            if !s.is_empty() {
                strings.push(s);
            }
        }
        Ok(strings)
    }

    /// Reads a possibly compressed domain name.
    ///
    /// Labels are joined with `.` and carry no trailing dot. A pointer always
    /// terminates the name: the suffix is decoded from the packet context and
    /// this reader resumes right after the two pointer bytes.
    pub(crate) fn read_name(&mut self) -> Result<String> {
        let mut labels = vec![];
        self.read_labels(&mut labels, 0)?;
        Ok(labels.join("."))
    }

    fn read_labels(&mut self, labels: &mut Vec<String>, hops: usize) -> Result<()> {
        loop {
            let len = self.read_u8()?;
            match len & LABEL_POINTER {
                0x00 => {
                    if len == 0 {
                        return Ok(());
                    }
                    let label = self.read_bytes(len as usize)?;
                    if !label.is_empty() {
                        labels.push(String::from_utf8_lossy(label).into_owned());
                    }
                }
                LABEL_POINTER => {
                    if hops >= MAX_POINTER_HOPS {
                        return Err(Error::ErrTooManyPtr);
                    }
                    let lo = self.read_u8()?;
                    let ptr = (((len & !LABEL_POINTER) as usize) << 8) | lo as usize;
                    let packet = self.ctx.bytes();
                    if ptr >= packet.len() {
                        return Err(Error::ErrUnexpectedEof);
                    }
                    let mut sub = Reader {
                        buf: packet,
                        off: ptr,
                        ctx: self.ctx,
                    };
                    return sub.read_labels(labels, hops + 1);
                }
                _ => return Err(Error::ErrReserved),
            }
        }
    }
}
