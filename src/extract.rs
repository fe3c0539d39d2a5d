//! Single-file pipeline: container bytes → decoded buffer → assignments → record.

use std::path::Path;

use crate::codec::{container, AssignmentMap, OpcodeWalker, WalkOutcome};
use crate::config::DecodeOptions;
use crate::error::Result;
use crate::record::MapRecord;

/// Decode a container and walk its payload.
pub fn walk_bytes(file: &[u8], options: &DecodeOptions) -> Result<WalkOutcome> {
    let buffer = container::decode(file, options)?;
    Ok(OpcodeWalker::new(options.unknown_opcodes).run(buffer.as_bytes())?)
}

pub fn walk_file(path: &Path, options: &DecodeOptions) -> Result<WalkOutcome> {
    let bytes = std::fs::read(path)?;
    walk_bytes(&bytes, options)
}

pub fn extract_assignments(assignments: &AssignmentMap) -> Result<MapRecord> {
    Ok(MapRecord::extract(assignments)?)
}

pub fn extract_bytes(file: &[u8], options: &DecodeOptions) -> Result<MapRecord> {
    let outcome = walk_bytes(file, options)?;
    extract_assignments(&outcome.assignments)
}

/// Read one container file and build its record.
pub fn extract_file(path: &Path, options: &DecodeOptions) -> Result<MapRecord> {
    let bytes = std::fs::read(path)?;
    extract_bytes(&bytes, options)
}
