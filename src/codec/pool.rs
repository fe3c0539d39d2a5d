//! String constant pool declared by the `DeclarePool` opcode.
//!
//! Layout following the opcode byte:
//! - U16: pool size (entry-count field + string bytes)
//! - U16: declared entry count
//! - pool size - 2 bytes: null-terminated strings

use crate::error::DecodeError;
use super::{BinaryReader, DecodeResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<String>,
}

impl ConstantPool {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Parse a pool record. `reader` must sit just past the opcode byte and is
    /// left just past the record.
    pub fn parse(reader: &mut BinaryReader) -> DecodeResult<Self> {
        let offset = reader.position();
        let available = reader.remaining();
        let overrun = |declared: usize| DecodeError::PoolOverrun { offset, declared, available };

        if available < 4 {
            return Err(overrun(4));
        }
        let pool_size = reader.read_u16_le()? as usize;
        let declared_count = reader.read_u16_le()? as usize;

        // The size field counts the entry-count field itself
        let Some(body_len) = pool_size.checked_sub(2) else {
            return Err(overrun(pool_size));
        };
        if body_len > reader.remaining() {
            return Err(overrun(pool_size + 2));
        }
        let body = reader.read_bytes(body_len)?;

        let entries: Vec<String> = body
            .split(|&b| b == 0)
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();

        if entries.len() != declared_count {
            tracing::debug!(
                offset,
                declared_count,
                found = entries.len(),
                "constant pool entry count mismatch"
            );
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Look up an entry. `offset` is the operand position reported on failure.
    pub fn lookup(&self, index: usize, offset: usize) -> DecodeResult<&str> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or(DecodeError::PoolIndexOutOfRange { offset, index, len: self.entries.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_null() {
        // size = 2 + "id\0width\0".len()
        let data = [
            0x0B, 0x00, 0x02, 0x00,
            b'i', b'd', 0x00, b'w', b'i', b'd', b't', b'h', 0x00,
            0x1D,
        ];
        let mut reader = BinaryReader::new(&data);
        let pool = ConstantPool::parse(&mut reader).unwrap();

        assert_eq!(pool.lookup(0, 0).unwrap(), "id");
        assert_eq!(pool.lookup(1, 0).unwrap(), "width");
        // Trailing terminator yields a final empty entry
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.lookup(2, 0).unwrap(), "");
        assert_eq!(reader.position(), 13);
    }

    #[test]
    fn test_entry_count_is_not_enforced() {
        let data = [0x04, 0x00, 0x09, 0x00, b'a', 0x00];
        let pool = ConstantPool::parse(&mut BinaryReader::new(&data)).unwrap();
        assert_eq!(pool.entries(), &["a".to_string(), String::new()]);
    }

    #[test]
    fn test_declared_size_past_end() {
        let data = [0x20, 0x00, 0x01, 0x00, b'a', 0x00];
        let err = ConstantPool::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, DecodeError::PoolOverrun { offset: 0, declared: 34, available: 6 }));
    }

    #[test]
    fn test_size_below_count_field() {
        let data = [0x01, 0x00, 0x00, 0x00];
        let err = ConstantPool::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, DecodeError::PoolOverrun { .. }));
    }

    #[test]
    fn test_lookup_out_of_range() {
        let pool = ConstantPool::new(vec!["a".into(), "b".into()]);
        assert_eq!(
            pool.lookup(5, 0x42),
            Err(DecodeError::PoolIndexOutOfRange { offset: 0x42, index: 5, len: 2 })
        );
    }
}
