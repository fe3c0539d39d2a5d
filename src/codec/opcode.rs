//! Opcode dispatch table.
//!
//! Only the opcodes needed to recover variable assignments are listed. Every
//! byte without a row is an unknown opcode and handled by the walker's
//! [`UnknownOpcodePolicy`](crate::config::UnknownOpcodePolicy). Supporting a
//! new opcode means adding one row to [`OPCODES`].

use super::walker::OpcodeWalker;
use super::{BinaryReader, DecodeResult};

/// Opcode bytes
pub mod op {
    pub const POP: u8 = 0x17;
    pub const GET_MEMBER: u8 = 0x1C;
    pub const SET_VARIABLE: u8 = 0x1D;
    pub const CALL_METHOD: u8 = 0x52;
    pub const DECLARE_POOL: u8 = 0x88;
    pub const PUSH: u8 = 0x96;
}

/// Operand type tags inside a Push block
pub mod tag {
    pub const STRING: u8 = 0;
    pub const FLOAT: u8 = 1;
    pub const NULL: u8 = 2;
    pub const UNDEFINED: u8 = 3;
    pub const REGISTER: u8 = 4;
    pub const BOOLEAN: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const INTEGER: u8 = 7;
    pub const POOL8: u8 = 8;
    pub const POOL16: u8 = 9;
}

/// Executes one opcode. The reader sits just past the opcode byte; `offset`
/// is the position of the opcode byte itself.
pub type Handler = fn(&mut OpcodeWalker, &mut BinaryReader<'_>, usize) -> DecodeResult<()>;

#[derive(Clone, Copy)]
pub struct OpcodeDef {
    pub code: u8,
    pub name: &'static str,
    pub exec: Handler,
}

impl std::fmt::Debug for OpcodeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#04x})", self.name, self.code)
    }
}

pub const OPCODES: &[OpcodeDef] = &[
    OpcodeDef { code: op::DECLARE_POOL, name: "DeclarePool", exec: OpcodeWalker::declare_pool },
    OpcodeDef { code: op::PUSH, name: "Push", exec: OpcodeWalker::push },
    OpcodeDef { code: op::SET_VARIABLE, name: "SetVariable", exec: OpcodeWalker::set_variable },
    OpcodeDef { code: op::GET_MEMBER, name: "GetMember", exec: OpcodeWalker::no_op },
    OpcodeDef { code: op::CALL_METHOD, name: "CallMethod", exec: OpcodeWalker::no_op },
    // Deliberately leaves the operand stack alone
    OpcodeDef { code: op::POP, name: "Pop", exec: OpcodeWalker::no_op },
];

const fn build_table() -> [Option<OpcodeDef>; 256] {
    let mut table: [Option<OpcodeDef>; 256] = [None; 256];
    let mut i = 0;
    while i < OPCODES.len() {
        table[OPCODES[i].code as usize] = Some(OPCODES[i]);
        i += 1;
    }
    table
}

static TABLE: [Option<OpcodeDef>; 256] = build_table();

pub fn lookup(code: u8) -> Option<&'static OpcodeDef> {
    TABLE[code as usize].as_ref()
}
