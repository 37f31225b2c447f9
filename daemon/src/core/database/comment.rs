use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::{AccountObject, CommentObject, CommentVoteObject, RewardFundObject},
    store::{IndexKey, ObjectId},
};
use ezira_common::{
    asset::{Asset, Symbol},
    config::{
        CONTENT_REWARD_DECAY_RATE, CURATION_REWARD_PERCENT, PERCENT_100, VOTE_RECHARGE_TIME,
        VOTE_RESERVE_RATE,
    },
    reward::reward_share,
    time::{DurationSeconds, TimestampSeconds, SECONDS_PER_DAY, TIME_MAX},
};
use log::{debug, info, log_enabled, Level};
use primitive_types::U256;

/// Mana left from `mana` spent at `last_used`, regenerated linearly until
/// `now` so that an empty pool is full again after `recharge_time`.
pub fn regenerated_mana(
    mana: u16,
    last_used: TimestampSeconds,
    now: TimestampSeconds,
    recharge_time: DurationSeconds,
) -> u16 {
    let elapsed = now.saturating_sub(last_used);
    let regenerated = (PERCENT_100 as u64).saturating_mul(elapsed) / recharge_time;
    (mana as u64).saturating_add(regenerated).min(PERCENT_100 as u64) as u16
}

/// Mana spent by an action of `percent` basis points with `mana` available.
///
/// A full action spends a fraction of the mana so that `reserve_rate` full
/// actions a day can be repeated forever.
pub fn mana_cost(mana: u16, percent: u16, reserve_rate: u64, recharge_time: DurationSeconds) -> u16 {
    let used = mana as u64 * percent as u64 / PERCENT_100 as u64;
    let denominator = reserve_rate * recharge_time / SECONDS_PER_DAY;
    ((used + denominator - 1) / denominator) as u16
}

/// Voting mana of `account` at `now`.
pub fn current_voting_mana(account: &AccountObject, now: TimestampSeconds) -> u16 {
    regenerated_mana(account.voting_mana, account.last_vote_time, now, VOTE_RECHARGE_TIME)
}

pub fn vote_mana_cost(mana: u16, weight: i16) -> u16 {
    mana_cost(mana, weight.unsigned_abs(), VOTE_RESERVE_RATE, VOTE_RECHARGE_TIME)
}

// Content claims decay linearly over the decay window
fn decayed_claims(claims: u128, elapsed: u64) -> u128 {
    if elapsed >= CONTENT_REWARD_DECAY_RATE {
        return 0;
    }
    let decay = U256::from(claims) * U256::from(elapsed) / U256::from(CONTENT_REWARD_DECAY_RATE);
    claims - decay.as_u128()
}

// Share of a reward paid to a weight out of a total weight, rounded down
fn weighted_share(amount: i64, weight: u64, total: u64) -> i64 {
    if amount <= 0 || total == 0 {
        return 0;
    }
    (amount as u128 * weight as u128 / total as u128) as i64
}

impl Database {
    /// Pay every comment whose cashout time is reached.
    ///
    /// The claims of every due comment are added to the fund before any of
    /// them is paid, so comments cashing out in the same block share the fund
    /// in proportion to their claims.
    pub(super) fn process_comment_cashout(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let coin = Symbol::coin();
        let fund = self.get_reward_fund(&coin)?;
        let fund_id = fund.id;
        let elapsed = now.saturating_sub(fund.last_update);
        let content_constant = fund.content_constant;

        let due: Vec<ObjectId> = self
            .store
            .iter_index::<CommentObject>(CommentObject::BY_CASHOUT_TIME, &IndexKey::new())
            .take_while(|comment| comment.cashout_time <= now)
            .map(|comment| comment.id)
            .collect();

        let mut claims = Vec::with_capacity(due.len());
        let mut new_claims: u128 = 0;
        for id in &due {
            let comment = self.store.get::<CommentObject>(*id)?;
            let claim = if comment.net_reward() > 0 {
                comment.reward_curve.evaluate(comment.net_reward() as u128, content_constant)
            } else {
                0
            };
            new_claims = new_claims.saturating_add(claim);
            claims.push((*id, claim));
        }

        let (fund_balance, total_claims) = {
            let decayed = decayed_claims(fund.recent_content_claims, elapsed);
            (fund.content_reward_balance, decayed.saturating_add(new_claims))
        };
        self.store.modify::<RewardFundObject, _>(fund_id, |fund| {
            fund.recent_content_claims = total_claims;
            fund.last_update = now;
        })?;

        let mut paid: i64 = 0;
        for (id, claim) in claims {
            let comment = self.store.get::<CommentObject>(id)?;
            let mut reward = reward_share(fund_balance, claim, total_claims);
            if comment.max_accepted_payout.symbol == coin {
                reward = reward.min(comment.max_accepted_payout.amount);
            }

            if reward > 0 {
                self.pay_comment(id, reward, &coin)?;
                paid += reward;
            }
            self.store.modify::<CommentObject, _>(id, |comment| {
                comment.total_payout_value += reward;
                comment.last_payout = now;
                comment.cashout_time = TIME_MAX;
            })?;
        }

        if paid > 0 {
            self.store.modify::<RewardFundObject, _>(fund_id, |fund| {
                fund.content_reward_balance -= paid;
            })?;
            debug!("paid {} out of the content reward fund of {}", paid, fund_balance);
        }
        Ok(())
    }

    // Split a comment reward between its curators, beneficiaries and author
    fn pay_comment(&mut self, id: ObjectId, reward: i64, symbol: &Symbol) -> Result<(), BlockchainError> {
        let comment = self.store.get::<CommentObject>(id)?.clone();

        let mut curation_paid: i64 = 0;
        if comment.allow_curation_rewards && comment.total_vote_weight > 0 {
            let curation = Asset::new(reward, symbol.clone()).percent(CURATION_REWARD_PERCENT).amount;
            let votes: Vec<CommentVoteObject> = self
                .store
                .iter_index::<CommentVoteObject>(
                    CommentVoteObject::BY_COMMENT_VOTER,
                    &CommentVoteObject::comment_key(id),
                )
                .filter(|vote| vote.weight > 0)
                .cloned()
                .collect();
            for vote in votes {
                let share = weighted_share(curation, vote.weight, comment.total_vote_weight);
                if share > 0 {
                    self.adjust_reward_balance(&vote.voter, &Asset::new(share, symbol.clone()))?;
                    curation_paid += share;
                }
            }
        }

        let author_share = reward - curation_paid;
        let mut beneficiary_paid: i64 = 0;
        for route in &comment.beneficiaries {
            let share = weighted_share(author_share, route.weight as u64, PERCENT_100 as u64);
            if share > 0 {
                self.adjust_reward_balance(&route.account, &Asset::new(share, symbol.clone()))?;
                beneficiary_paid += share;
            }
        }

        let author_paid = author_share - beneficiary_paid;
        if author_paid > 0 {
            self.adjust_reward_balance(&comment.author, &Asset::new(author_paid, symbol.clone()))?;
        }

        self.store.modify::<CommentObject, _>(id, |comment| {
            comment.author_rewards += author_paid;
            comment.curator_payout += curation_paid;
            comment.beneficiary_payout += beneficiary_paid;
        })?;

        if log_enabled!(Level::Info) {
            info!(
                "comment {}/{} paid {} {}: {} to the author, {} to curators, {} to beneficiaries",
                comment.author, comment.permlink, reward, symbol, author_paid, curation_paid, beneficiary_paid
            );
        }
        Ok(())
    }
}
