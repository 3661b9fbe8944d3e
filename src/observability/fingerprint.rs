//! Loggable identifiers for key material
//!
//! Raw key bytes never reach a log line. A fingerprint is the first eight
//! bytes of the SHA-256 digest, hex encoded.

use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

pub fn fingerprint(keys: &[u8]) -> String {
    let digest = Sha256::digest(keys);
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let fp = fingerprint(b"abc");
        // SHA-256("abc") = ba7816bf8f01cfea...
        assert_eq!(fp, "ba7816bf8f01cfea");
    }

    #[test]
    fn test_fingerprint_distinguishes_keys() {
        assert_ne!(fingerprint(&[1u8; 32]), fingerprint(&[2u8; 32]));
    }
}
