use byteorder::{BigEndian, ByteOrder};

use shared::error::*;

// Fixed-width big-endian integer helpers. The unpack functions return the
// decoded value and the offset just past it.

pub(crate) fn pack_uint8(mut msg: Vec<u8>, field: u8) -> Vec<u8> {
    msg.push(field);
    msg
}

pub(crate) fn pack_uint16(mut msg: Vec<u8>, field: u16) -> Vec<u8> {
    let mut b = [0u8; UINT16LEN];
    BigEndian::write_u16(&mut b, field);
    msg.extend_from_slice(&b);
    msg
}

pub(crate) fn pack_uint32(mut msg: Vec<u8>, field: u32) -> Vec<u8> {
    let mut b = [0u8; UINT32LEN];
    BigEndian::write_u32(&mut b, field);
    msg.extend_from_slice(&b);
    msg
}

pub(crate) fn unpack_uint8(msg: &[u8], off: usize) -> Result<(u8, usize)> {
    if off >= msg.len() {
        return Err(Error::ErrUnexpectedEof);
    }
    Ok((msg[off], off + 1))
}

pub(crate) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    let end = off + UINT16LEN;
    if end > msg.len() {
        return Err(Error::ErrUnexpectedEof);
    }
    Ok((BigEndian::read_u16(&msg[off..end]), end))
}

pub(crate) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    let end = off + UINT32LEN;
    if end > msg.len() {
        return Err(Error::ErrUnexpectedEof);
    }
    Ok((BigEndian::read_u32(&msg[off..end]), end))
}

// UINT16LEN is the length (in bytes) of a uint16.
pub(crate) const UINT16LEN: usize = 2;

// UINT32LEN is the length (in bytes) of a uint32.
pub(crate) const UINT32LEN: usize = 4;
