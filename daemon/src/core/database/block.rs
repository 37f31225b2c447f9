use super::{Database, GLOBAL_PROPERTIES_ID};
use crate::{
    config::{validate_invariants_enabled, SkipFlags},
    core::{
        error::BlockchainError,
        objects::{BlockSummaryObject, DynamicGlobalPropertyObject, ProducerObject, RewardFundObject},
        store::UndoSession,
    },
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    block::{BlockNumber, SignedBlock},
    config::{BLOCK_INTERVAL, CREDIT_INTERVAL_BLOCKS, MAX_BLOCK_SIZE},
    crypto::{Hash, KeyPair},
    serializer::Serializer,
    time::TimestampSeconds,
    transaction::SignedTransaction,
};
use log::{debug, info, log_enabled, trace, warn, Level};
use std::sync::Arc;

impl Database {
    /// Apply a block received from a producer, switching forks if it makes a
    /// longer chain.
    pub fn push_block(&mut self, block: &SignedBlock, skip: SkipFlags) -> Result<(), BlockchainError> {
        self.check_not_halted()?;
        let block = Arc::new(block.clone());
        let result = self.without_pending_transactions(|db| db.push_block_inner(block, skip));
        self.check_fatal(result)
    }

    fn push_block_inner(&mut self, block: Arc<SignedBlock>, skip: SkipFlags) -> Result<(), BlockchainError> {
        let id = block.id();
        if self.fork_db.contains(&id) {
            debug!("block {} is already known", id);
            return Ok(());
        }

        let num = block.block_num();
        if *block.previous() == self.head_block_id()? {
            self.fork_db.push(block.clone())?;
            if let Err(e) = self.apply_block_in_session(&block, skip) {
                warn!("block {} at height {} rejected: {}", id, num, e);
                self.fork_db.remove(&id);
                return Err(e);
            }
        } else {
            self.fork_db.push(block.clone())?;
            if num <= self.head_block_num()? {
                info!("block {} at height {} stored on a side branch", id, num);
                return Ok(());
            }
            self.switch_forks(id, skip)?;
        }

        if log_enabled!(Level::Debug) {
            debug!("block {} at height {} applied with {} transactions", id, num, block.transactions.len());
        }
        self.update_irreversible()
    }

    // Pop to the common ancestor and apply the branch ending at `new_head`
    fn switch_forks(&mut self, new_head: Hash, skip: SkipFlags) -> Result<(), BlockchainError> {
        let (new_branch, old_branch) = self.fork_db.fetch_branches(new_head, self.head_block_id()?)?;
        info!(
            "switching to fork {}: popping {} blocks, applying {}",
            new_head,
            old_branch.len(),
            new_branch.len()
        );

        for _ in &old_branch {
            self.pop_block_internal()?;
        }

        for (applied, block) in new_branch.iter().rev().enumerate() {
            if let Err(e) = self.apply_block_in_session(block, skip) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("block {} of the new fork failed, restoring the previous chain: {}", block.id(), e);
                self.fork_db.remove(&block.id());
                for _ in 0..applied {
                    self.pop_block_internal()?;
                }
                for block in old_branch.iter().rev() {
                    self.apply_block_in_session(block, skip)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove the head block and put its transactions back in the pending state.
    pub fn pop_block(&mut self) -> Result<SignedBlock, BlockchainError> {
        self.check_not_halted()?;
        let result = self.pop_block_with_pending();
        self.check_fatal(result)
    }

    fn pop_block_with_pending(&mut self) -> Result<SignedBlock, BlockchainError> {
        let pending = self.clear_pending()?;
        let block = match self.pop_block_internal() {
            Ok(block) => block,
            Err(e) => {
                if !e.is_fatal() {
                    self.restore_pending(pending.into_values())?;
                }
                return Err(e);
            }
        };
        self.fork_db.remove(&block.id());
        info!("popped block {} at height {}", block.id(), block.block_num());

        // Transactions of the popped block go first, they were applied first
        let popped = block
            .transactions
            .iter()
            .map(|tx| (tx.clone(), SkipFlags::NOTHING));
        self.restore_pending(popped.chain(pending.into_values()))?;
        Ok(block.as_ref().clone())
    }

    // Undo the session of the head block, the fork database is left untouched
    fn pop_block_internal(&mut self) -> Result<Arc<SignedBlock>, BlockchainError> {
        let head_num = self.head_block_num()?;
        if head_num == 0 {
            return Err(BlockchainError::NoBlockToPop);
        }
        if head_num <= self.fork_db.root_num() || self.store.undo_depth() == 0 {
            return Err(BlockchainError::NoUndoHistory(head_num));
        }

        let head_id = self.head_block_id()?;
        let block = self.fork_db.get(&head_id).ok_or(BlockchainError::NoBlockToPop)?;
        self.store.undo()?;
        trace!("undid block {} at height {}", head_id, head_num);
        Ok(block)
    }

    /// Build a block from the pending transactions that still apply, sign it
    /// with `key` and push it.
    pub fn generate_block(
        &mut self,
        timestamp: TimestampSeconds,
        producer: &AccountName,
        key: &KeyPair,
        skip: SkipFlags,
    ) -> Result<SignedBlock, BlockchainError> {
        self.check_not_halted()?;
        let candidates: Vec<SignedTransaction> = self
            .pending_transactions
            .values()
            .map(|(tx, _)| tx.clone())
            .collect();
        let result = self.without_pending_transactions(|db| {
            db.build_block(candidates, timestamp, producer, key, skip)
        });
        self.check_fatal(result)
    }

    fn build_block(
        &mut self,
        candidates: Vec<SignedTransaction>,
        timestamp: TimestampSeconds,
        producer: &AccountName,
        key: &KeyPair,
        skip: SkipFlags,
    ) -> Result<SignedBlock, BlockchainError> {
        let head_id = self.head_block_id()?;
        let mut size = SignedBlock::new(head_id, timestamp, producer.clone(), Vec::new(), key).size();
        let mut included = Vec::new();

        {
            // Trial run against the head state, dropped before the block is pushed
            let mut session = UndoSession::new(self);
            for tx in candidates {
                let tx_size = tx.size();
                if size + tx_size > MAX_BLOCK_SIZE {
                    debug!("block is full, leaving transaction {} pending", tx.id());
                    continue;
                }
                match session.apply_transaction_in_session(&tx, skip) {
                    Ok(()) => {
                        size += tx_size;
                        included.push(tx);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => debug!("leaving transaction {} out of the block: {}", tx.id(), e),
                }
            }
        }

        let block = SignedBlock::new(head_id, timestamp, producer.clone(), included, key);
        self.push_block_inner(Arc::new(block.clone()), skip)?;
        Ok(block)
    }

    pub(super) fn apply_block_in_session(
        &mut self,
        block: &Arc<SignedBlock>,
        skip: SkipFlags,
    ) -> Result<(), BlockchainError> {
        let mut session = UndoSession::new(self);
        session.apply_block(block, skip)?;
        session.push();
        Ok(())
    }

    // Every check, every transaction and the per-block processing of one block
    fn apply_block(&mut self, block: &SignedBlock, skip: SkipFlags) -> Result<(), BlockchainError> {
        let id = block.id();
        let num = block.block_num();
        let head_num = self.head_block_num()?;
        if num != head_num + 1 {
            return Err(BlockchainError::InvalidBlockNumber { num, head: head_num });
        }
        if *block.previous() != self.head_block_id()? {
            return Err(BlockchainError::UnlinkableBlock { id });
        }

        let dgp = self.global_properties()?;
        let head_time = dgp.time;
        let timestamp = block.timestamp();
        if timestamp <= head_time || (timestamp - dgp.genesis_time) % BLOCK_INTERVAL != 0 {
            return Err(BlockchainError::InvalidBlockTimestamp { timestamp, head_time });
        }

        let signing_key = self
            .find_producer(block.producer())
            .filter(|producer| producer.active)
            .map(|producer| producer.signing_key)
            .ok_or_else(|| BlockchainError::UnknownBlockProducer(block.producer().clone()))?;
        if !skip.contains(SkipFlags::PRODUCER_SIGNATURE) && !block.verify_producer_signature(&signing_key) {
            return Err(BlockchainError::InvalidProducerSignature(id));
        }
        if !skip.contains(SkipFlags::MERKLE_CHECK)
            && block.calculate_merkle_root() != block.header.transaction_merkle_root
        {
            return Err(BlockchainError::InvalidMerkleRoot(id));
        }
        if !skip.contains(SkipFlags::BLOCK_SIZE_CHECK) {
            let size = block.size();
            if size > MAX_BLOCK_SIZE {
                return Err(BlockchainError::BlockTooLarge {
                    size,
                    max: MAX_BLOCK_SIZE,
                });
            }
        }

        for tx in &block.transactions {
            self.apply_transaction(tx, skip)?;
        }

        let now = timestamp;
        self.update_global_properties(block, skip)?;
        self.update_block_summary(num, id)?;
        self.clear_expired_transactions(now)?;
        self.pay_block_rewards(block.producer(), num)?;
        self.process_comment_cashout(now)?;
        self.process_unstaking(now)?;
        self.process_savings_withdraws(now)?;
        self.process_recurring_transfers(now)?;
        self.process_escrows(now)?;
        self.process_account_recovery(now)?;
        self.process_memberships(now)?;
        if u64::from(num) % CREDIT_INTERVAL_BLOCKS == 0 {
            self.process_interest(now)?;
        }
        self.clear_expired_orders(now)?;

        if validate_invariants_enabled() {
            self.validate_invariants()?;
        }
        Ok(())
    }

    fn update_global_properties(&mut self, block: &SignedBlock, skip: SkipFlags) -> Result<(), BlockchainError> {
        let num = block.block_num();
        let id = block.id();
        let producer = block.producer().clone();
        let irreversible = if skip.contains(SkipFlags::UNDO_HISTORY_CHECK) {
            None
        } else {
            Some(num.saturating_sub(self.config.max_undo_history))
        };

        self.store
            .modify::<DynamicGlobalPropertyObject, _>(GLOBAL_PROPERTIES_ID, |dgp| {
                dgp.head_block_number = num;
                dgp.head_block_id = id;
                dgp.time = block.timestamp();
                dgp.current_producer = producer;
                if let Some(lib) = irreversible {
                    dgp.last_irreversible_block_num = dgp.last_irreversible_block_num.max(lib);
                }
            })?;
        Ok(())
    }

    fn update_block_summary(&mut self, num: BlockNumber, id: Hash) -> Result<(), BlockchainError> {
        let slot = (num & 0xffff) as u16;
        match self
            .store
            .find_by::<BlockSummaryObject>(BlockSummaryObject::BY_SLOT, &BlockSummaryObject::slot_key(slot))
        {
            Some(summary) => {
                let summary_id = summary.id;
                self.store
                    .modify::<BlockSummaryObject, _>(summary_id, |summary| summary.block_id = id)?;
            }
            None => {
                self.store.create(BlockSummaryObject {
                    id: 0,
                    slot,
                    block_id: id,
                })?;
            }
        }
        Ok(())
    }

    // New COIN for the producer and the content fund, never past the maximum supply
    fn pay_block_rewards(&mut self, producer: &AccountName, num: BlockNumber) -> Result<(), BlockchainError> {
        let coin = Symbol::coin();
        let dgp = self.global_properties()?;
        let (producer_reward, content_reward) = (dgp.producer_reward, dgp.content_reward);

        let producer_pay = producer_reward.min(self.remaining_supply(&coin)?);
        if producer_pay > 0 {
            let reward = Asset::new(producer_pay, coin.clone());
            self.adjust_supply(&reward)?;
            self.adjust_staked_balance(producer, &reward)?;
        }

        let content_pay = content_reward.min(self.remaining_supply(&coin)?);
        if content_pay > 0 {
            self.adjust_supply(&Asset::new(content_pay, coin.clone()))?;
            let fund_id = self.get_reward_fund(&coin)?.id;
            self.store.modify::<RewardFundObject, _>(fund_id, |fund| {
                fund.content_reward_balance += content_pay;
            })?;
        }

        let producer_id = self
            .find_producer(producer)
            .map(|p| p.id)
            .ok_or_else(|| BlockchainError::UnknownProducer(producer.clone()))?;
        self.store.modify::<ProducerObject, _>(producer_id, |p| {
            p.total_produced += 1;
            p.last_confirmed_block_num = num;
        })?;
        Ok(())
    }

    // Commit the blocks that became irreversible and write them to the block log
    fn update_irreversible(&mut self) -> Result<(), BlockchainError> {
        let lib = self.global_properties()?.last_irreversible_block_num;
        let root = self.fork_db.root_num();
        if lib <= root {
            return Ok(());
        }

        let blocks = self.fork_db.branch_range(self.head_block_id()?, root + 1, lib)?;
        if let Some(log) = self.block_log.as_mut() {
            for block in &blocks {
                log.append(block)?;
            }
        }
        self.store.commit(u64::from(lib));
        if let Some(last) = blocks.last() {
            self.fork_db.set_root(last.id());
        }
        debug!("blocks up to {} are irreversible", lib);
        Ok(())
    }
}
