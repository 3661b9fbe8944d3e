//! Platform key layouts
//!
//! The live slot holds the private key immediately followed by the public
//! key. Sizes depend on the cloud transport the platform uses:
//!
//! | Transport | Private | Public | Total |
//! |-----------|---------|--------|-------|
//! | TCP (Wi-Fi) | 1216 | 384 | 1600 |
//! | UDP (cellular) | 192 | 128 | 320 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{record_size, RecordError, RecordResult};

/// Cloud transport variant, which decides key sizes and rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Size of the key material in the live slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    private_size: usize,
    public_size: usize,
}

impl KeyLayout {
    pub const TCP_PRIVATE_KEY_SIZE: usize = 1216;
    pub const TCP_PUBLIC_KEY_SIZE: usize = 384;
    pub const UDP_PRIVATE_KEY_SIZE: usize = 192;
    pub const UDP_PUBLIC_KEY_SIZE: usize = 128;

    /// Standard layout for a transport
    pub fn for_transport(transport: Transport) -> Self {
        match transport {
            Transport::Tcp => Self {
                private_size: Self::TCP_PRIVATE_KEY_SIZE,
                public_size: Self::TCP_PUBLIC_KEY_SIZE,
            },
            Transport::Udp => Self {
                private_size: Self::UDP_PRIVATE_KEY_SIZE,
                public_size: Self::UDP_PUBLIC_KEY_SIZE,
            },
        }
    }

    /// Layout with explicit sizes. Fails if the total does not fit the
    /// record's 16-bit size field.
    pub fn new(private_size: usize, public_size: usize) -> RecordResult<Self> {
        let total = private_size.saturating_add(public_size);
        if total > usize::from(u16::MAX) {
            return Err(RecordError::KeySizeTooLarge(total));
        }
        Ok(Self {
            private_size,
            public_size,
        })
    }

    /// Opaque blob of `key_size` bytes with no private/public split.
    pub fn opaque(key_size: usize) -> RecordResult<Self> {
        Self::new(key_size, 0)
    }

    pub fn private_size(&self) -> usize {
        self.private_size
    }

    pub fn public_size(&self) -> usize {
        self.public_size
    }

    /// Total key blob size (KEY_SIZE)
    pub fn key_size(&self) -> usize {
        self.private_size + self.public_size
    }

    /// Bytes the backup record occupies on the medium
    pub fn record_size(&self) -> usize {
        record_size(self.key_size())
    }
}
