//! Compressed map container.
//!
//! Header layout (8 bytes):
//! - 3 bytes: signature (`CWS` zlib, `FWS` stored, `ZWS` lzma)
//! - U8: format version
//! - U32: declared size of the decoded payload
//!
//! The payload starts at offset 8.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::config::{DecodeOptions, SizeField};
use crate::error::DecodeError;
use super::{BinaryReader, DecodeResult};

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Zlib,
    Stored,
    Lzma,
    /// Unrecognized signature; inflated like `Zlib`.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub signature: [u8; 3],
    pub version: u8,
    pub declared_size: u32,
}

impl ContainerHeader {
    pub fn read(reader: &mut BinaryReader) -> DecodeResult<Self> {
        let mut signature = [0u8; 3];
        signature.copy_from_slice(reader.read_bytes(3)?);
        Ok(Self {
            signature,
            version: reader.read_u8()?,
            declared_size: reader.read_u32_le()?,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        match &self.signature {
            b"CWS" => ContainerKind::Zlib,
            b"FWS" => ContainerKind::Stored,
            b"ZWS" => ContainerKind::Lzma,
            _ => ContainerKind::Unknown,
        }
    }

    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }

    /// Number of payload bytes the header promises under `size_field`.
    pub fn expected_len(&self, size_field: SizeField) -> DecodeResult<usize> {
        let declared = self.declared_size as usize;
        match size_field {
            SizeField::Payload => Ok(declared),
            SizeField::FileLength => declared.checked_sub(HEADER_LEN).ok_or_else(|| {
                DecodeError::corrupt(format!(
                    "declared file length {declared} is shorter than the {HEADER_LEN}-byte header"
                ))
            }),
        }
    }
}

/// Decoded payload of one container, the sole input to the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBuffer {
    pub header: ContainerHeader,
    bytes: Vec<u8>,
}

impl DecodedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Validate the header and decode the payload of a container file.
pub fn decode(file: &[u8], options: &DecodeOptions) -> DecodeResult<DecodedBuffer> {
    if file.len() < HEADER_LEN {
        return Err(DecodeError::Truncated { len: file.len(), need: HEADER_LEN });
    }
    let mut reader = BinaryReader::new(file);
    let header = ContainerHeader::read(&mut reader)?;
    let payload = &file[HEADER_LEN..];
    let expected = header.expected_len(options.size_field)?;

    if expected > options.max_decoded_size {
        return Err(DecodeError::corrupt(format!(
            "declared size {expected} exceeds limit {}",
            options.max_decoded_size
        )));
    }

    let bytes = match header.kind() {
        ContainerKind::Stored => payload.to_vec(),
        ContainerKind::Lzma => {
            return Err(DecodeError::UnsupportedCompression { signature: header.signature_str() });
        }
        ContainerKind::Unknown => {
            tracing::debug!(signature = %header.signature_str(), "unrecognized container signature, inflating as zlib");
            inflate(payload, expected)?
        }
        ContainerKind::Zlib => inflate(payload, expected)?,
    };

    if bytes.len() != expected {
        return Err(DecodeError::corrupt(format!(
            "declared {expected} decoded bytes, got {}{}",
            bytes.len(),
            if bytes.len() > expected { " or more" } else { "" }
        )));
    }

    tracing::debug!(
        signature = %header.signature_str(),
        version = header.version,
        compressed = payload.len(),
        decoded = bytes.len(),
        "container decoded"
    );

    Ok(DecodedBuffer { header, bytes })
}

/// Inflate at most `expected + 1` bytes, enough to detect an oversized stream
/// without trusting the payload.
fn inflate(payload: &[u8], expected: usize) -> DecodeResult<Vec<u8>> {
    let limit = expected as u64 + 1;
    let mut decoder = ZlibDecoder::new(payload).take(limit);
    let mut out = Vec::with_capacity(expected.min(1 << 20));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::corrupt(format!("zlib error: {e}")))?;
    Ok(out)
}

/// Wrap `payload` in a zlib-compressed `CWS` container whose size field
/// follows `size_field`.
pub fn encode(payload: &[u8], version: u8, size_field: SizeField) -> std::io::Result<Vec<u8>> {
    let declared = match size_field {
        SizeField::Payload => payload.len(),
        SizeField::FileLength => payload.len() + HEADER_LEN,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() / 2);
    out.extend_from_slice(b"CWS");
    out.push(version);
    out.extend_from_slice(&(declared as u32).to_le_bytes());

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        (0..200u32).map(|i| (i % 7) as u8).collect()
    }

    #[test]
    fn test_decode_zlib_container() {
        let file = encode(&payload(), 8, SizeField::Payload).unwrap();
        let decoded = decode(&file, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.as_bytes(), payload().as_slice());
        assert_eq!(decoded.header.kind(), ContainerKind::Zlib);
        assert_eq!(decoded.header.version, 8);
    }

    #[test]
    fn test_short_file_is_truncated() {
        let err = decode(b"CWS\x08\x10", &DecodeOptions::default()).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { len: 5, need: 8 });
    }

    #[test]
    fn test_declared_size_larger_than_decoded() {
        let mut file = encode(&payload(), 8, SizeField::Payload).unwrap();
        file[4..8].copy_from_slice(&300u32.to_le_bytes());
        let err = decode(&file, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }), "{err}");
    }

    #[test]
    fn test_declared_size_smaller_than_decoded() {
        let mut file = encode(&payload(), 8, SizeField::Payload).unwrap();
        file[4..8].copy_from_slice(&100u32.to_le_bytes());
        let err = decode(&file, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }));
    }

    #[test]
    fn test_garbage_payload_is_corrupt() {
        let mut file = b"CWS\x08".to_vec();
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11]);
        let err = decode(&file, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }));
    }

    #[test]
    fn test_file_length_size_field() {
        let file = encode(&payload(), 10, SizeField::FileLength).unwrap();

        let options = DecodeOptions { size_field: SizeField::FileLength, ..Default::default() };
        assert_eq!(decode(&file, &options).unwrap().len(), 200);

        // Same file under the strict payload reading is a size mismatch
        let err = decode(&file, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }));
    }

    #[test]
    fn test_stored_container() {
        let mut file = b"FWS\x08".to_vec();
        file.extend_from_slice(&3u32.to_le_bytes());
        file.extend_from_slice(&[0x17, 0x1C, 0x52]);
        let decoded = decode(&file, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.into_bytes(), vec![0x17, 0x1C, 0x52]);
    }

    #[test]
    fn test_lzma_container_unsupported() {
        let mut file = b"ZWS\x0D".to_vec();
        file.extend_from_slice(&3u32.to_le_bytes());
        file.extend_from_slice(&[0; 8]);
        let err = decode(&file, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedCompression { signature: "ZWS".into() });
    }

    #[test]
    fn test_size_limit() {
        let mut file = encode(&payload(), 8, SizeField::Payload).unwrap();
        file[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        let options = DecodeOptions { max_decoded_size: 1024, ..Default::default() };
        let err = decode(&file, &options).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }));
    }
}
