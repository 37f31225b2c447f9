//! Reversible blocks, on every known branch.
//!
//! The fork database holds each block above the last irreversible one,
//! whether it is on the main chain or on a competing branch. Blocks link to
//! the root (the last irreversible block) through their `previous` ids.

use super::error::BlockchainError;
use ezira_common::{
    block::{num_from_id, BlockNumber, SignedBlock},
    crypto::Hash,
};
use log::{debug, trace};
use std::{collections::HashMap, sync::Arc};

pub struct ForkDatabase {
    blocks: HashMap<Hash, Arc<SignedBlock>>,
    root_id: Hash,
    root_num: BlockNumber,
}

impl ForkDatabase {
    pub fn new(root_id: Hash) -> Self {
        Self {
            blocks: HashMap::new(),
            root_num: num_from_id(&root_id),
            root_id,
        }
    }

    pub fn root_id(&self) -> &Hash {
        &self.root_id
    }

    pub fn root_num(&self) -> BlockNumber {
        self.root_num
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn get(&self, id: &Hash) -> Option<Arc<SignedBlock>> {
        self.blocks.get(id).cloned()
    }

    /// Store a block whose parent is the root or another known block.
    pub fn push(&mut self, block: Arc<SignedBlock>) -> Result<(), BlockchainError> {
        let id = block.id();
        let previous = block.previous();
        if *previous != self.root_id && !self.blocks.contains_key(previous) {
            debug!("block {} does not link to the fork database", id);
            return Err(BlockchainError::UnlinkableBlock { id });
        }

        trace!("fork database: added block {} at height {}", id, block.block_num());
        self.blocks.insert(id, block);
        Ok(())
    }

    /// Remove a block and every block built on top of it.
    pub fn remove(&mut self, id: &Hash) {
        let mut pending = vec![*id];
        while let Some(current) = pending.pop() {
            if self.blocks.remove(&current).is_some() {
                trace!("fork database: removed block {}", current);
            }
            pending.extend(
                self.blocks
                    .iter()
                    .filter(|(_, block)| *block.previous() == current)
                    .map(|(child, _)| *child),
            );
        }
    }

    /// Blocks of both branches down to their common ancestor, newest first.
    pub fn fetch_branches(
        &self,
        first: Hash,
        second: Hash,
    ) -> Result<(Vec<Arc<SignedBlock>>, Vec<Arc<SignedBlock>>), BlockchainError> {
        let mut first_id = first;
        let mut second_id = second;
        let mut first_branch = Vec::new();
        let mut second_branch = Vec::new();

        while first_id != second_id {
            if num_from_id(&first_id) >= num_from_id(&second_id) {
                let block = self
                    .get(&first_id)
                    .ok_or(BlockchainError::UnlinkableBlock { id: first_id })?;
                first_id = *block.previous();
                first_branch.push(block);
            } else {
                let block = self
                    .get(&second_id)
                    .ok_or(BlockchainError::UnlinkableBlock { id: second_id })?;
                second_id = *block.previous();
                second_branch.push(block);
            }
        }

        Ok((first_branch, second_branch))
    }

    /// Blocks from `from` to `to` included on the branch ending at `head`, oldest first.
    pub fn branch_range(
        &self,
        head: Hash,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<Arc<SignedBlock>>, BlockchainError> {
        let mut blocks = Vec::new();
        let mut current = head;
        while num_from_id(&current) >= from && current != self.root_id {
            let block = self
                .get(&current)
                .ok_or(BlockchainError::UnlinkableBlock { id: current })?;
            current = *block.previous();
            if block.block_num() <= to {
                blocks.push(block);
            }
        }
        blocks.reverse();
        Ok(blocks)
    }

    /// Make `id` the new root and forget everything at or below its height.
    pub fn set_root(&mut self, id: Hash) {
        let num = num_from_id(&id);
        self.blocks.retain(|_, block| block.block_num() > num);
        // Branches that forked below the new root can never become the main chain
        let mut orphaned: Vec<Hash> = self
            .blocks
            .values()
            .filter(|block| block.block_num() == num + 1 && *block.previous() != id)
            .map(|block| block.id())
            .collect();
        orphaned.sort();
        for orphan in orphaned {
            self.remove(&orphan);
        }

        debug!("fork database root moved to block {} ({})", num, id);
        self.root_id = id;
        self.root_num = num;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezira_common::crypto::KeyPair;

    fn block(previous: Hash, timestamp: u64) -> Arc<SignedBlock> {
        let key = KeyPair::from_seed("producer");
        Arc::new(SignedBlock::new(
            previous,
            timestamp,
            "genesis".into(),
            Vec::new(),
            &key,
        ))
    }

    #[test]
    fn test_unlinkable_block() {
        let mut fork_db = ForkDatabase::new(Hash::zero());
        let orphan = block(Hash::new([7; 32]), 3);
        assert!(matches!(
            fork_db.push(orphan),
            Err(BlockchainError::UnlinkableBlock { .. })
        ));
        assert!(fork_db.is_empty());
    }

    #[test]
    fn test_branches_meet_at_common_ancestor() -> Result<(), BlockchainError> {
        let mut fork_db = ForkDatabase::new(Hash::zero());
        let b1 = block(Hash::zero(), 3);
        let a2 = block(b1.id(), 6);
        let a3 = block(a2.id(), 9);
        let b2 = block(b1.id(), 12);
        for b in [&b1, &a2, &a3, &b2] {
            fork_db.push(b.clone())?;
        }

        let (first, second) = fork_db.fetch_branches(a3.id(), b2.id())?;
        let first: Vec<Hash> = first.iter().map(|b| b.id()).collect();
        let second: Vec<Hash> = second.iter().map(|b| b.id()).collect();
        assert_eq!(first, vec![a3.id(), a2.id()]);
        assert_eq!(second, vec![b2.id()]);

        let range: Vec<Hash> = fork_db.branch_range(a3.id(), 1, 2)?.iter().map(|b| b.id()).collect();
        assert_eq!(range, vec![b1.id(), a2.id()]);
        Ok(())
    }

    #[test]
    fn test_remove_drops_descendants() -> Result<(), BlockchainError> {
        let mut fork_db = ForkDatabase::new(Hash::zero());
        let b1 = block(Hash::zero(), 3);
        let b2 = block(b1.id(), 6);
        let b3 = block(b2.id(), 9);
        for b in [&b1, &b2, &b3] {
            fork_db.push(b.clone())?;
        }

        fork_db.remove(&b2.id());
        assert!(fork_db.contains(&b1.id()));
        assert!(!fork_db.contains(&b2.id()));
        assert!(!fork_db.contains(&b3.id()));
        Ok(())
    }

    #[test]
    fn test_set_root_prunes() -> Result<(), BlockchainError> {
        let mut fork_db = ForkDatabase::new(Hash::zero());
        let b1 = block(Hash::zero(), 3);
        let b2 = block(b1.id(), 6);
        let other = block(Hash::zero(), 9);
        let other2 = block(other.id(), 12);
        for b in [&b1, &b2, &other, &other2] {
            fork_db.push(b.clone())?;
        }

        fork_db.set_root(b1.id());
        assert_eq!(fork_db.root_num(), 1);
        assert_eq!(fork_db.len(), 1);
        assert!(fork_db.contains(&b2.id()));
        Ok(())
    }
}
