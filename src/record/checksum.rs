//! 16-bit additive checksum over the key payload
//!
//! A plain running sum of every byte with modulo-65536 wraparound. It
//! catches accidental corruption of the medium, not tampering, and must stay
//! bit-for-bit stable so records written by older firmware still validate.

/// Computes the wrapping 16-bit sum of all payload bytes.
pub fn compute_checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(payload: &[u8], expected: u16) -> bool {
    compute_checksum(payload) == expected
}
