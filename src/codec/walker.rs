//! Restricted interpreter that recovers variable assignments from an action stream.

use indexmap::IndexMap;

use crate::config::UnknownOpcodePolicy;
use crate::error::DecodeError;
use super::opcode::{self, tag};
use super::{BinaryReader, ConstantPool, DecodeResult, OperandStack, Value};

/// Variable name → last value assigned to it, in first-assignment order.
pub type AssignmentMap = IndexMap<String, Value>;

/// Counters collected during one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub interpreted: usize,
    pub unknown_skipped: usize,
    pub pool_declarations: usize,
    pub assignments: usize,
    pub reversed_pairs: usize,
    pub discarded_keys: usize,
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub assignments: AssignmentMap,
    pub stats: WalkStats,
}

/// Walker state for a single buffer. Never reused across files.
#[derive(Debug)]
pub struct OpcodeWalker {
    policy: UnknownOpcodePolicy,
    pool: ConstantPool,
    stack: OperandStack,
    assignments: AssignmentMap,
    stats: WalkStats,
}

impl OpcodeWalker {
    pub fn new(policy: UnknownOpcodePolicy) -> Self {
        Self {
            policy,
            pool: ConstantPool::default(),
            stack: OperandStack::new(),
            assignments: AssignmentMap::new(),
            stats: WalkStats::default(),
        }
    }

    /// Interpret `buffer` from the first byte to the last.
    pub fn run(mut self, buffer: &[u8]) -> DecodeResult<WalkOutcome> {
        let mut reader = BinaryReader::new(buffer);

        while let Some(code) = reader.peek() {
            let offset = reader.position();
            reader.skip(1)?;

            match opcode::lookup(code) {
                Some(def) => {
                    tracing::trace!(offset, opcode = ?def, "exec");
                    (def.exec)(&mut self, &mut reader, offset)?;
                    self.stats.interpreted += 1;
                }
                None => match self.policy {
                    UnknownOpcodePolicy::Skip => self.stats.unknown_skipped += 1,
                    UnknownOpcodePolicy::Strict => {
                        return Err(DecodeError::UnknownOpcode { offset, opcode: code });
                    }
                },
            }
        }

        tracing::debug!(
            interpreted = self.stats.interpreted,
            unknown_skipped = self.stats.unknown_skipped,
            pools = self.stats.pool_declarations,
            assignments = self.stats.assignments,
            leftover_stack = self.stack.len(),
            "walk complete"
        );

        Ok(WalkOutcome {
            assignments: self.assignments,
            stats: self.stats,
        })
    }

    pub(super) fn declare_pool(&mut self, reader: &mut BinaryReader<'_>, offset: usize) -> DecodeResult<()> {
        let pool = ConstantPool::parse(reader)?;
        if self.stats.pool_declarations > 0 {
            // A later declaration replaces the earlier pool wholesale
            tracing::debug!(offset, old = self.pool.len(), new = pool.len(), "constant pool redeclared");
        }
        self.pool = pool;
        self.stats.pool_declarations += 1;
        Ok(())
    }

    pub(super) fn push(&mut self, reader: &mut BinaryReader<'_>, _offset: usize) -> DecodeResult<()> {
        let len = reader.read_u16_le()? as usize;
        let mut block = reader.sub_reader(len)?;

        while !block.is_empty() {
            if let Some(value) = self.read_operand(&mut block)? {
                self.stack.push(value);
            }
        }
        Ok(())
    }

    /// Decode one typed operand. Types outside the value model are skipped
    /// by width and yield `None`.
    fn read_operand(&self, block: &mut BinaryReader<'_>) -> DecodeResult<Option<Value>> {
        let kind = block.read_u8()?;
        let value = match kind {
            tag::STRING => Some(Value::Str(block.read_cstr()?)),
            tag::BOOLEAN => Some(Value::Bool(block.read_bool()?)),
            tag::INTEGER => Some(Value::U32(block.read_u32_le()?)),
            tag::POOL8 => {
                let at = block.position();
                let index = block.read_u8()? as usize;
                Some(Value::Str(self.pool.lookup(index, at)?.to_owned()))
            }
            tag::POOL16 => {
                let at = block.position();
                let index = block.read_u16_le()? as usize;
                Some(Value::Str(self.pool.lookup(index, at)?.to_owned()))
            }
            tag::FLOAT => {
                block.skip(4)?;
                None
            }
            tag::REGISTER => {
                block.skip(1)?;
                None
            }
            tag::DOUBLE => {
                block.skip(8)?;
                None
            }
            tag::NULL | tag::UNDEFINED => None,
            other => {
                tracing::trace!(offset = block.position() - 1, tag = other, "unknown push operand tag");
                None
            }
        };
        Ok(value)
    }

    /// Bind a name to a value. The name is normally below the value; when only
    /// the top entry is a string the pair is taken as pushed value-first.
    pub(super) fn set_variable(&mut self, _reader: &mut BinaryReader<'_>, offset: usize) -> DecodeResult<()> {
        let (below, top) = self.stack.pop_pair(offset)?;
        let (name, value) = match (below, top) {
            (Value::Str(name), value) => (name, value),
            (value, Value::Str(name)) => {
                self.stats.reversed_pairs += 1;
                (name, value)
            }
            (Value::Bool(_) | Value::U32(_), Value::Bool(_) | Value::U32(_)) => {
                self.stats.discarded_keys += 1;
                return Ok(());
            }
        };
        tracing::trace!(offset, %name, %value, "assign");
        self.assignments.insert(name, value);
        self.stats.assignments += 1;
        Ok(())
    }

    pub(super) fn no_op(&mut self, _reader: &mut BinaryReader<'_>, _offset: usize) -> DecodeResult<()> {
        Ok(())
    }
}

/// Walk a decoded buffer and return its assignments.
pub fn walk(buffer: &[u8], policy: UnknownOpcodePolicy) -> DecodeResult<AssignmentMap> {
    Ok(OpcodeWalker::new(policy).run(buffer)?.assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::opcode::op;
    use crate::codec::writer::{ActionWriter, PushOperand};

    fn walk_skip(buffer: &[u8]) -> DecodeResult<AssignmentMap> {
        walk(buffer, UnknownOpcodePolicy::Skip)
    }

    #[test]
    fn test_value_then_key_assigns() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["id"])
            .push(&[PushOperand::U32(7)])
            .push(&[PushOperand::Pool8(0)])
            .set_variable();

        let outcome = OpcodeWalker::new(UnknownOpcodePolicy::Skip)
            .run(&actions.into_vec())
            .unwrap();
        assert_eq!(outcome.assignments.get("id"), Some(&Value::U32(7)));
        assert_eq!(outcome.stats.reversed_pairs, 1);
    }

    #[test]
    fn test_key_then_value_assigns() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["id"])
            .push(&[PushOperand::Pool8(0)])
            .push(&[PushOperand::U32(7)])
            .set_variable();

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("id"), Some(&Value::U32(7)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_pool_index_out_of_range() {
        let mut actions = ActionWriter::new();
        actions.declare_pool(&["a", "b"]).push(&[PushOperand::Pool8(5)]);

        let err = walk_skip(&actions.into_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::PoolIndexOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_set_variable_underflow() {
        let mut actions = ActionWriter::new();
        actions.declare_pool(&["id"]).push(&[PushOperand::Pool8(0)]);
        let prefix_len = actions.into_vec().len();

        let mut actions = ActionWriter::new();
        actions.declare_pool(&["id"]).push(&[PushOperand::Pool8(0)]).set_variable();

        let err = walk_skip(&actions.into_vec()).unwrap_err();
        assert_eq!(err, DecodeError::StackUnderflow { offset: prefix_len, need: 2, have: 1 });
    }

    #[test]
    fn test_unknown_bytes_between_assignments() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["w"])
            .opcode(0x47)
            .push(&[PushOperand::U32(10)])
            .opcode(0x00)
            .push(&[PushOperand::Pool8(0)])
            .opcode(0x0A)
            .set_variable();

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("w"), Some(&Value::U32(10)));
    }

    #[test]
    fn test_strict_policy_rejects_unknown() {
        let mut actions = ActionWriter::new();
        actions.declare_pool(&["w"]).opcode(0x47);
        let pool_len = actions.into_vec().len() - 1;

        let mut actions = ActionWriter::new();
        actions.declare_pool(&["w"]).opcode(0x47);
        let err = walk(&actions.into_vec(), UnknownOpcodePolicy::Strict).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { offset: pool_len, opcode: 0x47 });
    }

    #[test]
    fn test_no_op_opcodes_leave_stack() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["bOutdoor"])
            .push(&[PushOperand::Pool8(0), PushOperand::Bool(true)])
            .opcode(op::POP)
            .opcode(op::GET_MEMBER)
            .opcode(op::CALL_METHOD)
            .set_variable();

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("bOutdoor"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_last_write_wins() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["musicId", "id"])
            .assign_pooled(0, PushOperand::U32(1))
            .assign_pooled(1, PushOperand::U32(2))
            .assign_pooled(0, PushOperand::U32(3));

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("musicId"), Some(&Value::U32(3)));
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["musicId", "id"]);
    }

    #[test]
    fn test_non_string_key_discarded() {
        let mut actions = ActionWriter::new();
        actions
            .push(&[PushOperand::U32(1), PushOperand::U32(2)])
            .set_variable();

        let outcome = OpcodeWalker::new(UnknownOpcodePolicy::Skip)
            .run(&actions.into_vec())
            .unwrap();
        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.stats.discarded_keys, 1);
    }

    #[test]
    fn test_pool_redeclaration_overwrites() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["first"])
            .declare_pool(&["second"])
            .assign_pooled(0, PushOperand::Bool(false));

        let outcome = OpcodeWalker::new(UnknownOpcodePolicy::Skip)
            .run(&actions.into_vec())
            .unwrap();
        assert_eq!(outcome.assignments.get("second"), Some(&Value::Bool(false)));
        assert!(outcome.assignments.get("first").is_none());
        assert_eq!(outcome.stats.pool_declarations, 2);
    }

    #[test]
    fn test_push_block_past_buffer_end() {
        // Block claims 16 bytes, only 5 follow
        let data = [0x96, 0x10, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00];
        let err = walk_skip(&data).unwrap_err();
        assert_eq!(err, DecodeError::BufferOverrun { offset: 3, need: 16, have: 5 });
    }

    #[test]
    fn test_operand_past_block_end() {
        // Integer operand needs 4 bytes but the block only holds 2 after the tag
        let data = [0x96, 0x03, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00];
        let err = walk_skip(&data).unwrap_err();
        assert_eq!(err, DecodeError::BufferOverrun { offset: 4, need: 4, have: 2 });
    }

    #[test]
    fn test_inline_string_and_pool16() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["unused", "mapData"])
            .push(&[PushOperand::Pool16(1), PushOperand::Str("0a1b2c".into())])
            .set_variable();

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("mapData"), Some(&Value::from("0a1b2c")));
    }

    #[test]
    fn test_skipped_operand_types_push_nothing() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["canAggro"])
            .push(&[
                PushOperand::Pool8(0),
                PushOperand::Raw(tag::DOUBLE, vec![0; 8]),
                PushOperand::Raw(tag::NULL, vec![]),
                PushOperand::Raw(tag::REGISTER, vec![3]),
                PushOperand::Raw(tag::FLOAT, vec![0; 4]),
                PushOperand::Bool(true),
            ])
            .set_variable();

        let map = walk_skip(&actions.into_vec()).unwrap();
        assert_eq!(map.get("canAggro"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_deterministic() {
        let mut actions = ActionWriter::new();
        actions
            .declare_pool(&["id", "width", "mapData"])
            .opcode(0x4E)
            .assign_pooled(0, PushOperand::U32(100))
            .assign_pooled(1, PushOperand::U32(15))
            .assign_pooled(2, PushOperand::Str("abc".into()));
        let buffer = actions.into_vec();

        let first = walk_skip(&buffer).unwrap();
        for _ in 0..4 {
            assert_eq!(walk_skip(&buffer).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_buffer() {
        assert!(walk_skip(&[]).unwrap().is_empty());
    }
}
