pub mod reader;
pub mod writer;
pub mod value;
pub mod stack;
pub mod pool;
pub mod opcode;
pub mod walker;
pub mod container;

pub use reader::BinaryReader;
pub use writer::{ActionWriter, BinaryWriter, PushOperand};
pub use value::{Value, ValueKind};
pub use stack::OperandStack;
pub use pool::ConstantPool;
pub use opcode::{OpcodeDef, OPCODES};
pub use walker::{walk, AssignmentMap, OpcodeWalker, WalkOutcome, WalkStats};
pub use container::{ContainerHeader, ContainerKind, DecodedBuffer};

pub type DecodeResult<T> = std::result::Result<T, crate::error::DecodeError>;
