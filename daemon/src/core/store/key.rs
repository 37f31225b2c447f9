use ezira_common::{crypto::Hash, time::TimestampSeconds};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered byte key of a secondary index.
///
/// Components are encoded so that comparing the bytes compares the values
/// component by component: integers are big-endian, signed integers have
/// their sign bit flipped, strings are escaped and terminated. A key built
/// from the first components of another is a prefix of it.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_str(mut self, value: &str) -> Self {
        for byte in value.bytes() {
            self.0.push(byte);
            if byte == 0 {
                self.0.push(0xff);
            }
        }
        self.0.extend_from_slice(&[0, 0]);
        self
    }

    pub fn with_bool(mut self, value: bool) -> Self {
        self.0.push(value as u8);
        self
    }

    pub fn with_u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn with_u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn with_u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn with_i64(mut self, value: i64) -> Self {
        let flipped = (value as u64) ^ (1 << 63);
        self.0.extend_from_slice(&flipped.to_be_bytes());
        self
    }

    pub fn with_time(self, value: TimestampSeconds) -> Self {
        self.with_u64(value)
    }

    pub fn with_hash(mut self, value: &Hash) -> Self {
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &IndexKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexKey({})", hex::encode(&self.0))
    }
}
