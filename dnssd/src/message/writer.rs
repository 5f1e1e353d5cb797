use super::packer::*;
use shared::error::*;

// MAX_LABEL_LEN is the longest label RFC 1035 allows (63 octets).
const MAX_LABEL_LEN: usize = 63;

// PACK_STARTING_CAP is the default initial buffer size allocated during
// packing. Most mDNS packets fit in it.
const PACK_STARTING_CAP: usize = 512;

/// Appends wire-format fields to a growing buffer.
///
/// Names are always written uncompressed.
#[derive(Debug)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            buf: Vec::with_capacity(PACK_STARTING_CAP),
        }
    }
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.buf = pack_uint8(std::mem::take(&mut self.buf), v);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.buf = pack_uint16(std::mem::take(&mut self.buf), v);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.buf = pack_uint32(std::mem::take(&mut self.buf), v);
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// Writes a character string as a length byte plus the raw bytes.
    pub(crate) fn write_string(&mut self, s: &str) -> Result<()> {
        if s.len() > u8::MAX as usize {
            return Err(Error::ErrStringTooLong);
        }
        self.write_u8(s.len() as u8);
        self.write_bytes(s.as_bytes());
        Ok(())
    }

    pub(crate) fn write_strings<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        for s in strings {
            self.write_string(s.as_ref())?;
        }
        Ok(())
    }

    /// Writes a name as uncompressed labels followed by the root label.
    ///
    /// Empty labels (leading, trailing or doubled dots) are skipped.
    pub(crate) fn write_name(&mut self, name: &str) -> Result<()> {
        for label in name.split('.').filter(|l| !l.is_empty()) {
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::ErrSegTooLong);
            }
            self.write_u8(label.len() as u8);
            self.write_bytes(label.as_bytes());
        }
        self.write_u8(0);
        Ok(())
    }

    /// Writes a 16-bit length prefix followed by `data`.
    pub(crate) fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }
        self.write_u16(data.len() as u16);
        self.write_bytes(data);
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}
