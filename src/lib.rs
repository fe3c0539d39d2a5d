//! Map metadata converter
//!
//! Recovers map metadata from compiled map containers: inflates the
//! container, walks its action stream to collect variable assignments and
//! builds a typed record that serializes to JSON.

pub mod codec;
pub mod config;
pub mod error;
pub mod record;
pub mod extract;
pub mod batch;

pub use error::{DecodeError, Error, FieldError, Result};
pub use config::{BatchConfig, DecodeOptions, SizeField, UnknownOpcodePolicy};
pub use codec::{
    AssignmentMap, ConstantPool, DecodedBuffer, OpcodeWalker, OperandStack,
    Value, ValueKind, WalkOutcome, WalkStats,
};
pub use record::{MapRecord, REQUIRED_FIELDS};
pub use extract::{extract_bytes, extract_file, walk_bytes, walk_file};
pub use batch::{run_batch, BatchEvent, BatchSummary, FileOutcome};
