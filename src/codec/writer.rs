use super::opcode::{op, tag};

/// Little-endian byte writer, the encoding counterpart of [`BinaryReader`].
///
/// [`BinaryReader`]: super::BinaryReader
#[derive(Debug, Default)]
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(if v { 1 } else { 0 });
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a string followed by a null terminator
    pub fn write_cstr(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
    }
}

/// One operand inside a Push block.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOperand {
    Str(String),
    Bool(bool),
    U32(u32),
    Pool8(u8),
    Pool16(u16),
    /// Raw tag byte followed by raw payload, for operand types the walker skips.
    Raw(u8, Vec<u8>),
}

/// Emits action records. Used to build fixtures and re-encode streams.
#[derive(Debug, Default)]
pub struct ActionWriter {
    out: BinaryWriter,
}

impl ActionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.out.into_vec()
    }

    pub fn declare_pool<S: AsRef<str>>(&mut self, entries: &[S]) -> &mut Self {
        let mut body = BinaryWriter::new();
        for entry in entries {
            body.write_cstr(entry.as_ref());
        }
        // Size counts the entry-count field plus the string bytes
        self.out.write_u8(op::DECLARE_POOL);
        self.out.write_u16_le((body.len() + 2) as u16);
        self.out.write_u16_le(entries.len() as u16);
        self.out.write_bytes(body.as_slice());
        self
    }

    pub fn push(&mut self, operands: &[PushOperand]) -> &mut Self {
        let mut block = BinaryWriter::new();
        for operand in operands {
            match operand {
                PushOperand::Str(s) => {
                    block.write_u8(tag::STRING);
                    block.write_cstr(s);
                }
                PushOperand::Bool(b) => {
                    block.write_u8(tag::BOOLEAN);
                    block.write_bool(*b);
                }
                PushOperand::U32(v) => {
                    block.write_u8(tag::INTEGER);
                    block.write_u32_le(*v);
                }
                PushOperand::Pool8(i) => {
                    block.write_u8(tag::POOL8);
                    block.write_u8(*i);
                }
                PushOperand::Pool16(i) => {
                    block.write_u8(tag::POOL16);
                    block.write_u16_le(*i);
                }
                PushOperand::Raw(t, payload) => {
                    block.write_u8(*t);
                    block.write_bytes(payload);
                }
            }
        }
        self.out.write_u8(op::PUSH);
        self.out.write_u16_le(block.len() as u16);
        self.out.write_bytes(block.as_slice());
        self
    }

    pub fn set_variable(&mut self) -> &mut Self {
        self.opcode(op::SET_VARIABLE)
    }

    /// Write a single opcode byte (no operands)
    pub fn opcode(&mut self, code: u8) -> &mut Self {
        self.out.write_u8(code);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.out.write_bytes(bytes);
        self
    }

    /// Emit `name = value` using a pool index for the name.
    pub fn assign_pooled(&mut self, name_index: u8, value: PushOperand) -> &mut Self {
        self.push(&[PushOperand::Pool8(name_index), value]).set_variable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x01);
        writer.write_u16_le(0x0302);
        writer.write_u32_le(0x07060504);
        writer.write_cstr("ok");
        assert_eq!(
            writer.as_slice(),
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, b'o', b'k', 0x00]
        );
    }

    #[test]
    fn test_declare_pool_layout() {
        let mut actions = ActionWriter::new();
        actions.declare_pool(&["id", "w"]);
        assert_eq!(
            actions.into_vec(),
            vec![0x88, 0x07, 0x00, 0x02, 0x00, b'i', b'd', 0x00, b'w', 0x00]
        );
    }

    #[test]
    fn test_push_layout() {
        let mut actions = ActionWriter::new();
        actions.push(&[PushOperand::U32(7), PushOperand::Pool8(0)]);
        assert_eq!(
            actions.into_vec(),
            vec![0x96, 0x07, 0x00, 0x07, 0x07, 0x00, 0x00, 0x00, 0x08, 0x00]
        );
    }
}
