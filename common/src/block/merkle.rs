// Merkle root calculation for transaction lists

use crate::crypto::Hash;
use crate::transaction::SignedTransaction;

/// Calculate merkle root from a list of transactions
///
/// This creates a binary merkle tree where:
/// - Leaves are the digests of the signed transactions
/// - Parent nodes are hash(left || right)
/// - If odd number of nodes, last node is paired with itself
pub fn calculate_merkle_root(transactions: &[SignedTransaction]) -> Hash {
    if transactions.is_empty() {
        return Hash::zero();
    }

    let mut hashes: Vec<Hash> = transactions.iter().map(|tx| tx.merkle_digest()).collect();

    // A single transaction pairs with itself
    if hashes.len() == 1 {
        return hash_pair(&hashes[0], &hashes[0]);
    }

    while hashes.len() > 1 {
        hashes = hashes
            .chunks(2)
            .map(|chunk| {
                let left = &chunk[0];
                let right = chunk.get(1).unwrap_or(left);
                hash_pair(left, right)
            })
            .collect();
    }

    hashes[0]
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    crate::crypto::hash_parts(&[left.as_bytes(), right.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::Asset,
        operation::TransferOperation,
        transaction::{SignedTransaction, Transaction},
    };

    fn tx(amount: i64) -> SignedTransaction {
        SignedTransaction::new(Transaction::new(10).with_operation(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::coin(amount),
            memo: String::new(),
        }))
    }

    #[test]
    fn test_empty_root() {
        assert_eq!(calculate_merkle_root(&[]), Hash::zero());
    }

    #[test]
    fn test_single_pairs_with_itself() {
        let t = tx(1);
        let leaf = t.merkle_digest();
        assert_eq!(calculate_merkle_root(&[t]), hash_pair(&leaf, &leaf));
    }

    #[test]
    fn test_odd_count_and_order() {
        let txs = vec![tx(1), tx(2), tx(3)];
        let leaves: Vec<Hash> = txs.iter().map(|t| t.merkle_digest()).collect();
        let expected = hash_pair(
            &hash_pair(&leaves[0], &leaves[1]),
            &hash_pair(&leaves[2], &leaves[2]),
        );
        assert_eq!(calculate_merkle_root(&txs), expected);

        let reversed: Vec<_> = txs.into_iter().rev().collect();
        assert_ne!(calculate_merkle_root(&reversed), expected);
    }
}
