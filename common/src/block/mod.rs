mod merkle;

pub use merkle::calculate_merkle_root;

use crate::{
    account::AccountName,
    crypto::{hash, Hash, KeyPair, PublicKey, Signature},
    serializer::Serializer,
    time::TimestampSeconds,
    transaction::SignedTransaction,
};
use serde::{Deserialize, Serialize};

pub type BlockNumber = u32;

/// Block number embedded in the first four bytes of a block id.
pub fn num_from_id(id: &Hash) -> BlockNumber {
    let bytes = id.as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub previous: Hash,
    pub timestamp: TimestampSeconds,
    pub producer: AccountName,
    pub transaction_merkle_root: Hash,
}

impl_serializer!(BlockHeader {
    previous,
    timestamp,
    producer,
    transaction_merkle_root
});

impl BlockHeader {
    pub fn block_num(&self) -> BlockNumber {
        num_from_id(&self.previous).wrapping_add(1)
    }

    /// Header hash with the block number written over its first four bytes.
    pub fn id(&self) -> Hash {
        let mut bytes = hash(&self.to_bytes()).to_bytes();
        bytes[..4].copy_from_slice(&self.block_num().to_be_bytes());
        Hash::new(bytes)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub producer_signature: Signature,
    pub transactions: Vec<SignedTransaction>,
}

impl_serializer!(SignedBlock {
    header,
    producer_signature,
    transactions
});

impl SignedBlock {
    /// Build a block on top of `previous` and sign it.
    pub fn new(
        previous: Hash,
        timestamp: TimestampSeconds,
        producer: AccountName,
        transactions: Vec<SignedTransaction>,
        keypair: &KeyPair,
    ) -> Self {
        let header = BlockHeader {
            previous,
            timestamp,
            producer,
            transaction_merkle_root: calculate_merkle_root(&transactions),
        };
        let producer_signature = keypair.sign_hash(&header.id());
        Self {
            header,
            producer_signature,
            transactions,
        }
    }

    pub fn id(&self) -> Hash {
        self.header.id()
    }

    pub fn block_num(&self) -> BlockNumber {
        self.header.block_num()
    }

    pub fn previous(&self) -> &Hash {
        &self.header.previous
    }

    pub fn timestamp(&self) -> TimestampSeconds {
        self.header.timestamp
    }

    pub fn producer(&self) -> &AccountName {
        &self.header.producer
    }

    pub fn calculate_merkle_root(&self) -> Hash {
        calculate_merkle_root(&self.transactions)
    }

    pub fn verify_producer_signature(&self, key: &PublicKey) -> bool {
        key.verify(self.id().as_bytes(), &self.producer_signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_after(previous: Hash, key: &KeyPair) -> SignedBlock {
        SignedBlock::new(previous, 3, "genesis".into(), Vec::new(), key)
    }

    #[test]
    fn test_block_num_in_id() {
        let key = KeyPair::from_seed("producer");
        let first = block_after(Hash::zero(), &key);
        assert_eq!(first.block_num(), 1);
        assert_eq!(num_from_id(&first.id()), 1);

        let second = block_after(first.id(), &key);
        assert_eq!(second.block_num(), 2);
        assert_eq!(num_from_id(&second.id()), 2);
    }

    #[test]
    fn test_producer_signature() {
        let key = KeyPair::from_seed("producer");
        let block = block_after(Hash::zero(), &key);
        assert!(block.verify_producer_signature(&key.public_key()));
        assert!(!block.verify_producer_signature(&KeyPair::from_seed("other").public_key()));
    }

    #[test]
    fn test_serializer_roundtrip_keeps_id() {
        let block = block_after(Hash::zero(), &KeyPair::from_seed("producer"));
        let decoded = SignedBlock::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded.id(), block.id());
        assert_eq!(decoded.calculate_merkle_root(), Hash::zero());
    }
}
