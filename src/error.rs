use crate::codec::ValueKind;

/// Structural failure while decoding one container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("file truncated: {len} bytes, header needs {need}")]
    Truncated { len: usize, need: usize },

    #[error("corrupt payload: {reason}")]
    CorruptPayload { reason: String },

    #[error("unsupported compression: signature {signature:?}")]
    UnsupportedCompression { signature: String },

    #[error("constant pool at {offset:#x} overruns buffer: declared {declared} bytes, {available} available")]
    PoolOverrun { offset: usize, declared: usize, available: usize },

    #[error("constant pool index {index} out of range (pool has {len} entries) at {offset:#x}")]
    PoolIndexOutOfRange { offset: usize, index: usize, len: usize },

    #[error("stack underflow at {offset:#x}: need {need} values, have {have}")]
    StackUnderflow { offset: usize, need: usize, have: usize },

    #[error("buffer overrun at {offset:#x}: need {need} bytes, have {have}")]
    BufferOverrun { offset: usize, need: usize, have: usize },

    #[error("unknown opcode {opcode:#04x} at {offset:#x}")]
    UnknownOpcode { offset: usize, opcode: u8 },
}

impl DecodeError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptPayload { reason: reason.into() }
    }

    /// Offset into the decoded buffer, for errors raised by the walker.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::PoolOverrun { offset, .. }
            | Self::PoolIndexOutOfRange { offset, .. }
            | Self::StackUnderflow { offset, .. }
            | Self::BufferOverrun { offset, .. }
            | Self::UnknownOpcode { offset, .. } => Some(*offset),
            Self::Truncated { .. }
            | Self::CorruptPayload { .. }
            | Self::UnsupportedCompression { .. } => None,
        }
    }
}

/// Semantic failure: the walk succeeded but a required field is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{name}` has wrong type: expected {expected}, got {actual}")]
    WrongType {
        name: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("io error: {0}")]
    Io(String),

    #[error("json error: {0}")]
    Json(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
