use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

const OBJECT_ID_LEN: usize = 24;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Identifier of a locally authored facility.
///
/// Freshly generated ids are 24 lowercase hex characters so the upstream
/// facility registry accepts them as object ids. Ids read back from storage
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Not cryptographically secure.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..OBJECT_ID_LEN)
            .map(|_| HEX_DIGITS[rng.gen_range(0..16)] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == OBJECT_ID_LEN
            && self.0.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
