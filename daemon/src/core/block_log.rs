//! Append-only file of irreversible blocks.
//!
//! Each record is the big-endian u32 length of the encoded block followed by
//! the block bytes. Block `n` is the `n`-th record, the log is replayed on
//! open to rebuild the chain state.

use super::error::BlockchainError;
use ezira_common::{block::{BlockNumber, SignedBlock}, serializer::Serializer};
use log::{debug, info, warn};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

pub struct BlockLog {
    path: PathBuf,
    file: File,
    // Byte offset of every record
    offsets: Vec<u64>,
    end: u64,
}

impl BlockLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BlockchainError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();

        let mut offsets = Vec::new();
        let mut position = 0u64;
        let mut header = [0u8; 4];
        file.seek(SeekFrom::Start(0))?;
        while position < len {
            if len - position < 4 {
                return Err(BlockchainError::CorruptedBlockLog(format!(
                    "truncated record header at offset {}",
                    position
                )));
            }
            file.read_exact(&mut header)?;
            let size = u32::from_be_bytes(header) as u64;
            if len - position - 4 < size {
                return Err(BlockchainError::CorruptedBlockLog(format!(
                    "truncated block {} at offset {}",
                    offsets.len() + 1,
                    position
                )));
            }
            offsets.push(position);
            position += 4 + size;
            file.seek(SeekFrom::Start(position))?;
        }

        info!("opened block log {} with {} blocks", path.display(), offsets.len());
        Ok(Self {
            path,
            file,
            offsets,
            end: len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of the last block in the log, 0 when empty.
    pub fn head_num(&self) -> BlockNumber {
        self.offsets.len() as BlockNumber
    }

    pub fn append(&mut self, block: &SignedBlock) -> Result<(), BlockchainError> {
        let num = block.block_num();
        if num != self.head_num() + 1 {
            warn!(
                "refusing to append block {} after block {} in the block log",
                num,
                self.head_num()
            );
            return Err(BlockchainError::InvalidBlockNumber {
                num,
                head: self.head_num(),
            });
        }

        let bytes = block.to_bytes();
        let mut record = Vec::with_capacity(4 + bytes.len());
        record.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        record.extend_from_slice(&bytes);
        self.file.write_all(&record)?;
        self.file.flush()?;

        self.offsets.push(self.end);
        self.end += record.len() as u64;
        debug!("block {} written to the block log", num);
        Ok(())
    }

    pub fn read_block(&mut self, num: BlockNumber) -> Result<Option<SignedBlock>, BlockchainError> {
        let Some(offset) = num
            .checked_sub(1)
            .and_then(|index| self.offsets.get(index as usize))
            .copied()
        else {
            return Ok(None);
        };

        let mut header = [0u8; 4];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut header)?;
        let mut bytes = vec![0u8; u32::from_be_bytes(header) as usize];
        self.file.read_exact(&mut bytes)?;

        let block = SignedBlock::from_bytes(&bytes).map_err(|e| {
            BlockchainError::CorruptedBlockLog(format!("block {} cannot be decoded: {}", num, e))
        })?;
        if block.block_num() != num {
            return Err(BlockchainError::CorruptedBlockLog(format!(
                "record {} holds block {}",
                num,
                block.block_num()
            )));
        }
        Ok(Some(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezira_common::crypto::{Hash, KeyPair};
    use tempdir::TempDir;

    fn chain(length: usize) -> Vec<SignedBlock> {
        let key = KeyPair::from_seed("producer");
        let mut blocks: Vec<SignedBlock> = Vec::new();
        for i in 0..length {
            let previous = blocks.last().map(|b| b.id()).unwrap_or(Hash::zero());
            blocks.push(SignedBlock::new(
                previous,
                3 * (i as u64 + 1),
                "genesis".into(),
                Vec::new(),
                &key,
            ));
        }
        blocks
    }

    #[test]
    fn test_append_and_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("block_log")?;
        let path = dir.path().join("block_log");
        let blocks = chain(3);
        {
            let mut log = BlockLog::open(&path)?;
            for block in &blocks {
                log.append(block)?;
            }
            assert!(matches!(
                log.append(&blocks[0]),
                Err(BlockchainError::InvalidBlockNumber { num: 1, head: 3 })
            ));
        }

        let mut log = BlockLog::open(&path)?;
        assert_eq!(log.head_num(), 3);
        assert_eq!(log.read_block(2)?, Some(blocks[1].clone()));
        assert_eq!(log.read_block(4)?, None);
        assert_eq!(log.read_block(0)?, None);
        Ok(())
    }

    #[test]
    fn test_truncated_log_is_corrupted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("block_log")?;
        let path = dir.path().join("block_log");
        {
            let mut log = BlockLog::open(&path)?;
            for block in &chain(2) {
                log.append(block)?;
            }
        }

        let len = std::fs::metadata(&path)?.len();
        OpenOptions::new().write(true).open(&path)?.set_len(len - 5)?;
        assert!(matches!(
            BlockLog::open(&path),
            Err(BlockchainError::CorruptedBlockLog(_))
        ));
        Ok(())
    }
}
