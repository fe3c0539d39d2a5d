use crate::error::DecodeError;
use super::{DecodeResult, Value};

/// LIFO of operand values for one walk.
#[derive(Debug, Default)]
pub struct OperandStack {
    values: Vec<Value>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Pop the top value. `offset` is the opcode position reported on underflow.
    pub fn pop(&mut self, offset: usize) -> DecodeResult<Value> {
        self.values.pop().ok_or(DecodeError::StackUnderflow { offset, need: 1, have: 0 })
    }

    /// Pop `(below, top)` atomically: on underflow the stack is left untouched.
    pub fn pop_pair(&mut self, offset: usize) -> DecodeResult<(Value, Value)> {
        let have = self.values.len();
        if have < 2 {
            return Err(DecodeError::StackUnderflow { offset, need: 2, have });
        }
        let top = self.values.pop();
        let below = self.values.pop();
        match (below, top) {
            (Some(below), Some(top)) => Ok((below, top)),
            _ => Err(DecodeError::StackUnderflow { offset, need: 2, have }),
        }
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }
}
