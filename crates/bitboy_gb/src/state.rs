//! Little-endian byte codec used by save states.

use bitboy_common::bits;

use crate::{Error, Result};

#[derive(Default)]
pub(crate) struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn int(&mut self, value: u64, width: usize) {
        let mut bytes = [0u8; 8];
        bits::split_le(value, &mut bytes[..width]);
        self.buf.extend_from_slice(&bytes[..width]);
    }

    pub(crate) fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.u8(value as u8);
    }

    pub(crate) fn u16(&mut self, value: u16) {
        self.int(value as u64, 2);
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.int(value as u64, 4);
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.int(value, 8);
    }

    /// Raw bytes without a length prefix.
    pub(crate) fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed byte block.
    pub(crate) fn block(&mut self, bytes: &[u8]) {
        self.u32(bytes.len() as u32);
        self.raw(bytes);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn raw(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::StateTruncated)?;
        let bytes = self.data.get(self.pos..end).ok_or(Error::StateTruncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn int(&mut self, width: usize) -> Result<u64> {
        Ok(bits::join_le(self.raw(width)?))
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.raw(1)?[0])
    }

    pub(crate) fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(self.int(2)? as u16)
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(self.int(4)? as u32)
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.int(8)
    }

    /// Fixed-size array of raw bytes.
    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.raw(N)?);
        Ok(out)
    }

    /// Length-prefixed block whose length must be exactly `expected`.
    pub(crate) fn block(&mut self, what: &'static str, expected: usize) -> Result<&'a [u8]> {
        let found = self.u32()? as usize;
        if found != expected {
            return Err(Error::StateMismatch {
                what,
                expected,
                found,
            });
        }
        self.raw(found)
    }

    /// Length-prefixed block of any length.
    pub(crate) fn any_block(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.raw(len)
    }

    /// Fails if unread bytes remain.
    pub(crate) fn finish(self) -> Result<()> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            trailing => Err(Error::StateTrailing(trailing)),
        }
    }
}
