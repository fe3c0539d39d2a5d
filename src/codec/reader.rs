use crate::error::DecodeError;
use super::DecodeResult;

/// Bounds-checked little-endian reader over a decoded buffer.
///
/// Offsets in errors are absolute: a reader created with [`with_base`]
/// reports positions relative to the start of the enclosing buffer.
///
/// [`with_base`]: BinaryReader::with_base
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Absolute position of the cursor.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn overrun(&self, need: usize) -> DecodeError {
        DecodeError::BufferOverrun {
            offset: self.position(),
            need,
            have: self.remaining(),
        }
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        if self.remaining() < n {
            return Err(self.overrun(n));
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(self.overrun(n));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let v = self.peek().ok_or_else(|| self.overrun(1))?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16_le(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32_le(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64_le(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a null-terminated string; the terminator is consumed but not returned.
    pub fn read_cstr(&mut self) -> DecodeResult<String> {
        let rest = &self.data[self.pos..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(self.overrun(rest.len() + 1));
        };
        let bytes = self.read_bytes(len)?;
        self.pos += 1;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Split off the next `len` bytes as their own reader, advancing past them.
    pub fn sub_reader(&mut self, len: usize) -> DecodeResult<BinaryReader<'a>> {
        let base = self.position();
        let data = self.read_bytes(len)?;
        Ok(BinaryReader::with_base(data, base))
    }
}
