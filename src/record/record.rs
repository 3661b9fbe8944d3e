//! Backup record type and validation

use std::fmt;

use serde::Serialize;

use super::checksum::compute_checksum;
use super::errors::{RecordError, RecordResult};

/// Sentinel identifying a keyguard backup record.
pub const MAGIC: u32 = 0x75a6_5c63;

/// Bytes preceding the payload: magic (4) + declared size (2) + checksum (2).
pub const HEADER_SIZE: usize = 8;

/// Total on-medium size of a record carrying `key_size` payload bytes.
pub const fn record_size(key_size: usize) -> usize {
    HEADER_SIZE + key_size
}

/// Record persisted on the backup medium.
#[derive(Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Sentinel, [`MAGIC`] for a valid record
    pub magic: u32,
    /// Length of the payload field, not of the whole record
    pub declared_size: u16,
    /// Wrapping 16-bit sum of the payload bytes
    pub checksum: u16,
    /// Backed-up key material
    pub payload: Vec<u8>,
}

impl BackupRecord {
    /// Builds a valid record around a copy of `payload`.
    pub fn build(payload: &[u8]) -> RecordResult<Self> {
        let declared_size =
            u16::try_from(payload.len()).map_err(|_| RecordError::KeySizeTooLarge(payload.len()))?;

        Ok(Self {
            magic: MAGIC,
            declared_size,
            checksum: compute_checksum(payload),
            payload: payload.to_vec(),
        })
    }

    /// Serialize the record to its on-medium layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(record_size(self.payload.len()));
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.extend_from_slice(&self.declared_size.to_le_bytes());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Deserialize a record from exactly `record_size(key_size)` bytes.
    ///
    /// The payload is always `key_size` bytes long whatever `declared_size`
    /// says; the header is not checked here.
    pub fn decode(data: &[u8], key_size: usize) -> RecordResult<Self> {
        let expected = record_size(key_size);
        if data.len() != expected {
            return Err(RecordError::Length {
                expected,
                actual: data.len(),
            });
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let declared_size = u16::from_le_bytes([data[4], data[5]]);
        let checksum = u16::from_le_bytes([data[6], data[7]]);

        Ok(Self {
            magic,
            declared_size,
            checksum,
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }

    /// Returns true if the record passes every header check for `key_size`.
    pub fn is_valid(&self, key_size: usize) -> bool {
        validate(self, key_size).is_valid()
    }
}

// Key bytes stay out of debug output.
impl fmt::Debug for BackupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupRecord")
            .field("magic", &format_args!("{:#010x}", self.magic))
            .field("declared_size", &self.declared_size)
            .field("checksum", &format_args!("{:#06x}", self.checksum))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Why a record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// Magic field is not [`MAGIC`]
    BadMagic,
    /// Declared size differs from the configured key size
    SizeMismatch,
    /// Stored checksum disagrees with the payload
    ChecksumMismatch,
}

impl InvalidReason {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::BadMagic => "bad_magic",
            InvalidReason::SizeMismatch => "size_mismatch",
            InvalidReason::ChecksumMismatch => "checksum_mismatch",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of validating a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(InvalidReason),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

/// Validates magic, declared size and checksum, in that order.
pub fn validate(record: &BackupRecord, key_size: usize) -> Validity {
    if record.magic != MAGIC {
        return Validity::Invalid(InvalidReason::BadMagic);
    }
    if usize::from(record.declared_size) != key_size || record.payload.len() != key_size {
        return Validity::Invalid(InvalidReason::SizeMismatch);
    }
    if record.checksum != compute_checksum(&record.payload) {
        return Validity::Invalid(InvalidReason::ChecksumMismatch);
    }
    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sets_header() {
        let record = BackupRecord::build(&[0x01; 32]).unwrap();
        assert_eq!(record.magic, MAGIC);
        assert_eq!(record.declared_size, 32);
        assert_eq!(record.checksum, 0x20);
        assert_eq!(record.payload, vec![0x01; 32]);
        assert_eq!(validate(&record, 32), Validity::Valid);
    }

    #[test]
    fn test_build_rejects_oversized_payload() {
        let payload = vec![0u8; usize::from(u16::MAX) + 1];
        assert_eq!(
            BackupRecord::build(&payload),
            Err(RecordError::KeySizeTooLarge(payload.len()))
        );
    }

    #[test]
    fn test_encode_layout_is_little_endian() {
        let record = BackupRecord::build(&[0x02, 0x03]).unwrap();
        let bytes = record.encode();
        assert_eq!(bytes.len(), record_size(2));
        assert_eq!(&bytes[0..4], &[0x63, 0x5c, 0xa6, 0x75]);
        assert_eq!(&bytes[4..6], &[0x02, 0x00]);
        assert_eq!(&bytes[6..8], &[0x05, 0x00]);
        assert_eq!(&bytes[8..], &[0x02, 0x03]);
    }

    #[test]
    fn test_decode_requires_exact_length() {
        let record = BackupRecord::build(&[7u8; 16]).unwrap();
        let mut bytes = record.encode();
        bytes.pop();
        assert_eq!(
            BackupRecord::decode(&bytes, 16),
            Err(RecordError::Length {
                expected: 24,
                actual: 23
            })
        );
    }

    #[test]
    fn test_decode_ignores_declared_size_for_payload_length() {
        let mut record = BackupRecord::build(&[9u8; 16]).unwrap();
        record.declared_size = 4;
        let decoded = BackupRecord::decode(&record.encode(), 16).unwrap();
        assert_eq!(decoded.payload.len(), 16);
        assert_eq!(validate(&decoded, 16), Validity::Invalid(InvalidReason::SizeMismatch));
    }

    #[test]
    fn test_validate_reports_bad_magic_first() {
        let mut record = BackupRecord::build(&[1u8; 8]).unwrap();
        record.magic = 0;
        record.checksum = 0;
        assert_eq!(validate(&record, 8), Validity::Invalid(InvalidReason::BadMagic));
    }

    #[test]
    fn test_validate_detects_checksum_mismatch() {
        let mut record = BackupRecord::build(&[1u8; 8]).unwrap();
        record.payload[3] = 2;
        assert_eq!(
            validate(&record, 8),
            Validity::Invalid(InvalidReason::ChecksumMismatch)
        );
    }

    #[test]
    fn test_erased_medium_is_invalid() {
        let bytes = vec![0xFFu8; record_size(32)];
        let record = BackupRecord::decode(&bytes, 32).unwrap();
        assert!(!record.is_valid(32));
    }

    #[test]
    fn test_debug_hides_payload() {
        let record = BackupRecord::build(&[0xAB; 4]).unwrap();
        let debug = format!("{:?}", record);
        assert!(debug.contains("payload_len: 4"));
        assert!(!debug.contains("171"));
    }
}
