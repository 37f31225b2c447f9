use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    operation::BeneficiaryRoute,
    reward::RewardCurve,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentObject {
    pub id: ObjectId,
    pub author: AccountName,
    pub permlink: String,
    // Empty for root posts
    pub parent_author: AccountName,
    pub parent_permlink: String,
    pub root_comment: ObjectId,
    pub depth: u16,
    pub children: u32,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
    pub created: TimestampSeconds,
    pub last_update: TimestampSeconds,
    // Set once at creation, TIME_MAX once paid
    pub cashout_time: TimestampSeconds,
    pub net_rshares: i64,
    pub abs_rshares: i64,
    // Sum of positive rshares, drives curation weights
    pub vote_rshares: i64,
    pub total_vote_weight: u64,
    pub net_votes: i32,
    // Stake weighted views and shares, added to the rshares at cashout
    pub view_power: i64,
    pub view_count: u32,
    pub share_power: i64,
    pub share_count: u32,
    pub max_accepted_payout: Asset,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub reward_curve: RewardCurve,
    pub beneficiaries: Vec<BeneficiaryRoute>,
    pub author_rewards: i64,
    pub curator_payout: i64,
    pub beneficiary_payout: i64,
    pub total_payout_value: i64,
    pub last_payout: TimestampSeconds,
}

impl_object!(CommentObject, Table::Comments, {
    BY_PERMLINK: unique => |o| CommentObject::permlink_key(&o.author, &o.permlink),
    BY_CASHOUT_TIME: non_unique => |o| IndexKey::new().with_time(o.cashout_time),
    BY_PARENT: non_unique => |o| CommentObject::permlink_key(&o.parent_author, &o.parent_permlink),
});

impl CommentObject {
    pub fn permlink_key(author: &AccountName, permlink: &str) -> IndexKey {
        IndexKey::new().with_str(author.as_str()).with_str(permlink)
    }

    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }

    /// Weight of the comment in the reward fund.
    pub fn net_reward(&self) -> i64 {
        self.net_rshares
            .saturating_add(self.view_power)
            .saturating_add(self.share_power)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentVoteObject {
    pub id: ObjectId,
    pub voter: AccountName,
    pub comment: ObjectId,
    // Curation weight, zero for downvotes and changed votes
    pub weight: u64,
    pub rshares: i64,
    pub vote_percent: i16,
    pub last_update: TimestampSeconds,
    pub num_changes: u8,
}

impl_object!(CommentVoteObject, Table::CommentVotes, {
    BY_COMMENT_VOTER: unique => |o| CommentVoteObject::vote_key(o.comment, &o.voter),
});

impl CommentVoteObject {
    pub fn vote_key(comment: ObjectId, voter: &AccountName) -> IndexKey {
        CommentVoteObject::comment_key(comment).with_str(voter.as_str())
    }

    pub fn comment_key(comment: ObjectId) -> IndexKey {
        IndexKey::new().with_u64(comment)
    }
}

/// Stake weight a viewer added to a comment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentViewObject {
    pub id: ObjectId,
    pub viewer: AccountName,
    pub comment: ObjectId,
    pub reward: i64,
    pub created: TimestampSeconds,
}

impl_object!(CommentViewObject, Table::CommentViews, {
    BY_COMMENT_VIEWER: unique => |o| CommentVoteObject::vote_key(o.comment, &o.viewer),
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentShareObject {
    pub id: ObjectId,
    pub sharer: AccountName,
    pub comment: ObjectId,
    pub reward: i64,
    pub created: TimestampSeconds,
}

impl_object!(CommentShareObject, Table::CommentShares, {
    BY_COMMENT_SHARER: unique => |o| CommentVoteObject::vote_key(o.comment, &o.sharer),
});

/// Pool paying content rewards in one asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardFundObject {
    pub id: ObjectId,
    pub symbol: Symbol,
    pub content_reward_balance: i64,
    // Decaying sum of the claims paid recently
    pub recent_content_claims: u128,
    pub content_constant: u128,
    pub last_update: TimestampSeconds,
}

impl_object!(RewardFundObject, Table::RewardFunds, {
    BY_SYMBOL: unique => |o| IndexKey::new().with_str(o.symbol.as_str()),
});

impl RewardFundObject {
    pub fn symbol_key(symbol: &Symbol) -> IndexKey {
        IndexKey::new().with_str(symbol.as_str())
    }
}
