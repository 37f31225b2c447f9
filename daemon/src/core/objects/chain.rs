use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    block::BlockNumber,
    crypto::{Hash, PublicKey},
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

/// Singleton describing the head of the chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicGlobalPropertyObject {
    pub id: ObjectId,
    pub head_block_number: BlockNumber,
    pub head_block_id: Hash,
    pub time: TimestampSeconds,
    pub genesis_time: TimestampSeconds,
    pub current_producer: AccountName,
    pub last_irreversible_block_num: BlockNumber,
    // COIN minted per block
    pub producer_reward: i64,
    pub content_reward: i64,
}

impl_object!(DynamicGlobalPropertyObject, Table::GlobalProperties, {});

/// Block id of a recent block, one slot per value of the low 16 bits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockSummaryObject {
    pub id: ObjectId,
    pub slot: u16,
    pub block_id: Hash,
}

impl_object!(BlockSummaryObject, Table::BlockSummaries, {
    BY_SLOT: unique => |o| BlockSummaryObject::slot_key(o.slot),
});

impl BlockSummaryObject {
    pub fn slot_key(slot: u16) -> IndexKey {
        IndexKey::new().with_u16(slot)
    }
}

/// Applied transaction, kept until it expires to reject duplicates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionObject {
    pub id: ObjectId,
    pub trx_id: Hash,
    pub expiration: TimestampSeconds,
}

impl_object!(TransactionObject, Table::Transactions, {
    BY_TRX_ID: unique => |o| TransactionObject::trx_key(&o.trx_id),
    BY_EXPIRATION: non_unique => |o| IndexKey::new().with_time(o.expiration),
});

impl TransactionObject {
    pub fn trx_key(trx_id: &Hash) -> IndexKey {
        IndexKey::new().with_hash(trx_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProducerObject {
    pub id: ObjectId,
    pub owner: AccountName,
    pub signing_key: PublicKey,
    pub url: String,
    pub active: bool,
    pub created: TimestampSeconds,
    pub total_produced: u64,
    pub last_confirmed_block_num: BlockNumber,
}

impl_object!(ProducerObject, Table::Producers, {
    BY_OWNER: unique => |o| ProducerObject::owner_key(&o.owner),
});

impl ProducerObject {
    pub fn owner_key(owner: &AccountName) -> IndexKey {
        IndexKey::new().with_str(owner.as_str())
    }
}
