//! Backup record format for keyguard
//!
//! The backup medium holds exactly one fixed-size record:
//!
//! ```text
//! +------------------+
//! | Magic            | (u32 LE, 0x75a65c63)
//! +------------------+
//! | Declared Size    | (u16 LE, payload length only)
//! +------------------+
//! | Checksum         | (u16 LE, wrapping byte sum of payload)
//! +------------------+
//! | Payload          | (key_size bytes, private key then public key)
//! +------------------+
//! ```
//!
//! A record is valid only when all three header fields agree with the
//! payload. Invalid records are treated as absent data.

mod checksum;
mod errors;
mod record;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{RecordError, RecordResult};
pub use record::{record_size, validate, BackupRecord, InvalidReason, Validity, HEADER_SIZE, MAGIC};
