//! Stake subjects and their identifier encodings.
//!
//! Staking events carry a numeric subject type and a raw `uint256` subject id.
//! Each subject type has its own canonical string form:
//!
//! | Subject | Encoding | Example |
//! |---------|----------|---------|
//! | scanner | checksummed 20-byte address | `0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed` |
//! | agent | 32-byte zero-padded hex | `0x000…02a` |
//! | scanner pool | decimal | `7` |

use alloy_primitives::{hex, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// The entity a stake fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Scanner,
    Agent,
    ScannerPool,
}

impl SubjectType {
    /// Map the on-chain subject type tag. Unknown tags return `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Scanner),
            1 => Some(Self::Agent),
            2 => Some(Self::ScannerPool),
            _ => None,
        }
    }

    /// The on-chain subject type tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Scanner => 0,
            Self::Agent => 1,
            Self::ScannerPool => 2,
        }
    }

    /// Encode a raw subject id in this subject type's identifier format.
    pub fn encode_id(&self, id: U256) -> String {
        match self {
            Self::Scanner => scanner_id_hex(id),
            Self::Agent => agent_id_hex(id),
            Self::ScannerPool => pool_id(id),
        }
    }
}

/// Scanner ids are addresses: the low 20 bytes, checksummed.
pub fn scanner_id_hex(id: U256) -> String {
    Address::from_word(B256::from(id.to_be_bytes::<32>())).to_checksum(None)
}

/// Agent ids are the full 32-byte word in lowercase hex.
pub fn agent_id_hex(id: U256) -> String {
    format!("0x{}", hex::encode(id.to_be_bytes::<32>()))
}

/// Scanner pool ids are plain decimal.
pub fn pool_id(id: U256) -> String {
    id.to_string()
}
