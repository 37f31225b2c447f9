use crate::crypto::{Hash, HASH_SIZE};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Invalid size")]
    InvalidSize,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Invalid hex")]
    InvalidHex,
    #[error("Invalid UTF-8 string")]
    InvalidString,
    #[error("Exceeds max array size: {0}")]
    ExceedsMaxArraySize(usize),
    #[error("Unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },
}

/// Cursor over a byte slice used by `Serializer::read`.
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, total: 0 }
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if n > self.bytes.len() {
            return Err(ReaderError::UnexpectedEof {
                needed: n,
                available: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        self.total += n;
        Ok(head)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ReaderError> {
        Ok(self.read_bytes_ref(n)?.to_vec())
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        let bytes = self.read_bytes_ref(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_bytes_64(&mut self) -> Result<[u8; 64], ReaderError> {
        let bytes = self.read_bytes_ref(64)?;
        let mut out = [0u8; 64];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes = self.read_bytes_ref(HASH_SIZE)?;
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(bytes);
        Ok(Hash::new(out))
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.read_bytes_ref(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let bytes = self.read_bytes_ref(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.read_bytes_ref(4)?);
        Ok(u32::from_be_bytes(out))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.read_bytes_ref(8)?);
        Ok(u64::from_be_bytes(out))
    }

    pub fn read_u128(&mut self) -> Result<u128, ReaderError> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.read_bytes_ref(16)?);
        Ok(u128::from_be_bytes(out))
    }

    pub fn read_i16(&mut self) -> Result<i16, ReaderError> {
        let mut out = [0u8; 2];
        out.copy_from_slice(self.read_bytes_ref(2)?);
        Ok(i16::from_be_bytes(out))
    }

    pub fn read_i64(&mut self) -> Result<i64, ReaderError> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.read_bytes_ref(8)?);
        Ok(i64::from_be_bytes(out))
    }

    pub fn read_string_with_size(&mut self, size: usize) -> Result<String, ReaderError> {
        let bytes = self.read_bytes(size)?;
        String::from_utf8(bytes).map_err(|_| ReaderError::InvalidString)
    }

    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let size = self.read_u16()? as usize;
        self.read_string_with_size(size)
    }

    // Bytes left to read
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn total_read(&self) -> usize {
        self.total
    }
}
