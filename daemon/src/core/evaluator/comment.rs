use super::Evaluator;
use crate::core::{
    database::{current_voting_mana, mana_cost, regenerated_mana, vote_mana_cost, Database},
    error::BlockchainError,
    objects::{AccountObject, CommentObject, CommentShareObject, CommentViewObject, CommentVoteObject},
    store::ObjectId,
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    config::{
        CASHOUT_WINDOW, MAX_ASSET_SUPPLY, MAX_COMMENT_DEPTH, MAX_VOTE_CHANGES, MIN_SHARE_INTERVAL,
        MIN_VIEW_INTERVAL, MIN_VOTE_INTERVAL, PERCENT_100, SHARE_RECHARGE_TIME, SHARE_RESERVE_RATE,
        VIEW_RECHARGE_TIME, VIEW_RESERVE_RATE,
    },
    operation::{CommentOperation, CommentOptionsOperation, ShareOperation, ViewOperation, VoteOperation},
    reward::{approx_sqrt, RewardCurve},
    time::TIME_MAX,
};
use log::{debug, log_enabled, Level};

impl Evaluator for CommentOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let author_id = db.get_account(&self.author)?.id;

        if let Some(existing) = db.find_comment(&self.author, &self.permlink) {
            if existing.parent_author != self.parent_author
                || existing.parent_permlink != self.parent_permlink
            {
                return Err(BlockchainError::ContentRule("the parent of a comment cannot change"));
            }
            let id = existing.id;
            db.store_mut().modify::<CommentObject, _>(id, |comment| {
                comment.title = self.title.clone();
                comment.body = self.body.clone();
                comment.json_metadata = self.json_metadata.clone();
                comment.last_update = now;
            })?;
            debug!("comment {}/{} edited", self.author, self.permlink);
            return Ok(());
        }

        let parent = if self.is_root() {
            None
        } else {
            let parent = db.get_comment(&self.parent_author, &self.parent_permlink)?;
            if parent.depth >= MAX_COMMENT_DEPTH - 1 {
                return Err(BlockchainError::ContentRule("comment is nested too deep"));
            }
            Some((parent.id, parent.root_comment, parent.depth + 1))
        };

        let comment = CommentObject {
            id: 0,
            author: self.author.clone(),
            permlink: self.permlink.clone(),
            parent_author: self.parent_author.clone(),
            parent_permlink: self.parent_permlink.clone(),
            root_comment: parent.map(|(_, root, _)| root).unwrap_or(0),
            depth: parent.map(|(_, _, depth)| depth).unwrap_or(0),
            children: 0,
            title: self.title.clone(),
            body: self.body.clone(),
            json_metadata: self.json_metadata.clone(),
            created: now,
            last_update: now,
            cashout_time: now.saturating_add(CASHOUT_WINDOW),
            net_rshares: 0,
            abs_rshares: 0,
            vote_rshares: 0,
            total_vote_weight: 0,
            net_votes: 0,
            view_power: 0,
            view_count: 0,
            share_power: 0,
            share_count: 0,
            max_accepted_payout: Asset::new(MAX_ASSET_SUPPLY, Symbol::coin()),
            allow_votes: true,
            allow_curation_rewards: true,
            reward_curve: RewardCurve::default(),
            beneficiaries: Vec::new(),
            author_rewards: 0,
            curator_payout: 0,
            beneficiary_payout: 0,
            total_payout_value: 0,
            last_payout: 0,
        };

        let store = db.store_mut();
        let id = store.create(comment)?;
        match parent {
            Some((parent_id, _, _)) => {
                store.modify::<CommentObject, _>(parent_id, |parent| parent.children += 1)?;
            }
            None => {
                store.modify::<CommentObject, _>(id, |comment| comment.root_comment = id)?;
            }
        }
        store.modify::<AccountObject, _>(author_id, |account| {
            account.post_count += 1;
            account.last_post = now;
        })?;
        debug!("comment {}/{} created", self.author, self.permlink);
        Ok(())
    }
}

impl Evaluator for CommentOptionsOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let comment = db.get_comment(&self.author, &self.permlink)?;
        let id = comment.id;
        if comment.cashout_time == TIME_MAX {
            return Err(BlockchainError::ContentRule("comment was already paid"));
        }
        if self.max_accepted_payout.amount > comment.max_accepted_payout.amount {
            return Err(BlockchainError::ContentRule("max accepted payout can only decrease"));
        }
        if self.allow_votes && !comment.allow_votes {
            return Err(BlockchainError::ContentRule("votes cannot be enabled again"));
        }
        if self.allow_curation_rewards && !comment.allow_curation_rewards {
            return Err(BlockchainError::ContentRule("curation rewards cannot be enabled again"));
        }

        let has_votes = db
            .store()
            .iter_index::<CommentVoteObject>(
                CommentVoteObject::BY_COMMENT_VOTER,
                &CommentVoteObject::comment_key(id),
            )
            .next()
            .is_some();
        if has_votes && (self.reward_curve != comment.reward_curve || self.beneficiaries != comment.beneficiaries) {
            return Err(BlockchainError::ContentRule(
                "reward curve and beneficiaries cannot change once voted",
            ));
        }
        for route in &self.beneficiaries {
            db.get_account(&route.account)?;
        }

        db.store_mut().modify::<CommentObject, _>(id, |comment| {
            comment.max_accepted_payout = self.max_accepted_payout.clone();
            comment.allow_votes = self.allow_votes;
            comment.allow_curation_rewards = self.allow_curation_rewards;
            comment.reward_curve = self.reward_curve;
            comment.beneficiaries = self.beneficiaries.clone();
        })?;
        Ok(())
    }
}

impl Evaluator for VoteOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let voter = db.get_account(&self.voter)?;
        let voter_id = voter.id;
        let comment = db.get_comment(&self.author, &self.permlink)?.clone();

        if !comment.allow_votes {
            return Err(BlockchainError::ContentRule("comment does not accept votes"));
        }
        if comment.cashout_time == TIME_MAX {
            return Err(BlockchainError::ContentRule("comment was already paid"));
        }
        if now < voter.last_vote_time.saturating_add(MIN_VOTE_INTERVAL) {
            return Err(BlockchainError::ContentRule("voting too often"));
        }
        let stake = db.voting_stake(voter);
        if stake <= 0 {
            return Err(BlockchainError::ContentRule("no voting stake"));
        }

        let previous = db
            .find_comment_vote(comment.id, &self.voter)
            .map(|vote| (vote.id, vote.rshares, vote.weight, vote.vote_percent, vote.num_changes));
        match previous {
            None if self.weight == 0 => {
                return Err(BlockchainError::ContentRule("vote weight cannot be zero"));
            }
            Some((_, _, _, percent, changes)) => {
                if changes >= MAX_VOTE_CHANGES {
                    return Err(BlockchainError::ContentRule("vote changed too many times"));
                }
                if percent == self.weight {
                    return Err(BlockchainError::ContentRule("vote is unchanged"));
                }
            }
            None => {}
        }

        let mana = current_voting_mana(voter, now);
        let cost = vote_mana_cost(mana, self.weight);
        if cost > mana || (self.weight != 0 && mana == 0) {
            return Err(BlockchainError::ContentRule("not enough voting mana"));
        }
        let abs_rshares = (stake as i128 * cost as i128 / PERCENT_100 as i128) as i64;
        let rshares = if self.weight < 0 { -abs_rshares } else { abs_rshares };

        // Take back the previous vote before applying the new one
        let (mut net, mut abs, mut positive, mut total_weight, mut net_votes) = (
            comment.net_rshares,
            comment.abs_rshares,
            comment.vote_rshares,
            comment.total_vote_weight,
            comment.net_votes,
        );
        if let Some((_, old_rshares, old_weight, old_percent, _)) = previous {
            net -= old_rshares;
            abs -= old_rshares.abs();
            if old_rshares > 0 {
                positive -= old_rshares;
            }
            total_weight -= old_weight;
            net_votes -= old_percent.signum() as i32;
        }

        let old_positive = positive;
        net += rshares;
        abs += abs_rshares;
        if rshares > 0 {
            positive += rshares;
        }
        net_votes += self.weight.signum() as i32;

        // Curation weight grows with the square root of the positive rshares,
        // earlier votes earn more of it
        let curation_weight = if previous.is_none() && rshares > 0 && comment.allow_curation_rewards {
            (approx_sqrt(positive as u128) - approx_sqrt(old_positive as u128)) as u64
        } else {
            0
        };
        total_weight += curation_weight;

        let store = db.store_mut();
        store.modify::<CommentObject, _>(comment.id, |comment| {
            comment.net_rshares = net;
            comment.abs_rshares = abs;
            comment.vote_rshares = positive;
            comment.total_vote_weight = total_weight;
            comment.net_votes = net_votes;
        })?;
        match previous {
            Some((vote_id, ..)) => {
                store.modify::<CommentVoteObject, _>(vote_id, |vote| {
                    vote.rshares = rshares;
                    vote.weight = 0;
                    vote.vote_percent = self.weight;
                    vote.last_update = now;
                    vote.num_changes += 1;
                })?;
            }
            None => {
                store.create(CommentVoteObject {
                    id: 0,
                    voter: self.voter.clone(),
                    comment: comment.id,
                    weight: curation_weight,
                    rshares,
                    vote_percent: self.weight,
                    last_update: now,
                    num_changes: 0,
                })?;
            }
        }
        store.modify::<AccountObject, _>(voter_id, |account| {
            account.voting_mana = mana - cost;
            account.last_vote_time = now;
        })?;

        if log_enabled!(Level::Debug) {
            debug!(
                "{} voted {} on {}/{}: {} rshares",
                self.voter, self.weight, self.author, self.permlink, rshares
            );
        }
        Ok(())
    }
}

// Stake weight bought by spending one action worth of mana
struct ManaSpend {
    mana_left: u16,
    reward: i64,
}

fn spend_mana(
    stake: i64,
    mana: u16,
    reserve_rate: u64,
    recharge_time: u64,
) -> Result<ManaSpend, BlockchainError> {
    if mana == 0 {
        return Err(BlockchainError::ContentRule("no mana left"));
    }
    let cost = mana_cost(mana, PERCENT_100, reserve_rate, recharge_time);
    let reward = (stake as i128 * cost as i128 / PERCENT_100 as i128) as i64;
    Ok(ManaSpend {
        mana_left: mana - cost,
        reward,
    })
}

// A comment still collecting weight before its cashout
fn open_comment(
    db: &Database,
    author: &AccountName,
    permlink: &str,
) -> Result<(ObjectId, bool), BlockchainError> {
    let comment = db.get_comment(author, permlink)?;
    if comment.cashout_time == TIME_MAX {
        return Err(BlockchainError::ContentRule("comment was already paid"));
    }
    Ok((comment.id, comment.is_root()))
}

impl Evaluator for ViewOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let (comment_id, _) = open_comment(db, &self.author, &self.permlink)?;
        let existing = db
            .store()
            .find_by::<CommentViewObject>(
                CommentViewObject::BY_COMMENT_VIEWER,
                &CommentVoteObject::vote_key(comment_id, &self.viewer),
            )
            .map(|view| (view.id, view.reward));

        match (existing, self.viewed) {
            (None, true) => {
                let viewer = db.get_account(&self.viewer)?;
                let viewer_id = viewer.id;
                if now < viewer.last_view_time.saturating_add(MIN_VIEW_INTERVAL) {
                    return Err(BlockchainError::ContentRule("viewing too often"));
                }
                let mana = regenerated_mana(viewer.viewing_mana, viewer.last_view_time, now, VIEW_RECHARGE_TIME);
                let spend = spend_mana(db.voting_stake(viewer), mana, VIEW_RESERVE_RATE, VIEW_RECHARGE_TIME)?;
                if spend.reward <= 0 {
                    return Err(BlockchainError::ContentRule("view carries no stake weight"));
                }

                let store = db.store_mut();
                store.modify::<AccountObject, _>(viewer_id, |account| {
                    account.viewing_mana = spend.mana_left;
                    account.last_view_time = now;
                })?;
                store.modify::<CommentObject, _>(comment_id, |comment| {
                    comment.view_power += spend.reward;
                    comment.view_count += 1;
                })?;
                store.create(CommentViewObject {
                    id: 0,
                    viewer: self.viewer.clone(),
                    comment: comment_id,
                    reward: spend.reward,
                    created: now,
                })?;
                debug!("{} viewed {}/{}: {} weight", self.viewer, self.author, self.permlink, spend.reward);
            }
            (Some((view_id, reward)), false) => {
                let store = db.store_mut();
                store.modify::<CommentObject, _>(comment_id, |comment| {
                    comment.view_power -= reward;
                    comment.view_count -= 1;
                })?;
                store.remove::<CommentViewObject>(view_id)?;
                debug!("{} removed the view of {}/{}", self.viewer, self.author, self.permlink);
            }
            (Some(_), true) => return Err(BlockchainError::ContentRule("comment already viewed")),
            (None, false) => return Err(BlockchainError::ContentRule("no view to remove")),
        }
        Ok(())
    }
}

impl Evaluator for ShareOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let (comment_id, is_root) = open_comment(db, &self.author, &self.permlink)?;
        if !is_root {
            return Err(BlockchainError::ContentRule("only root posts can be shared"));
        }
        let existing = db
            .store()
            .find_by::<CommentShareObject>(
                CommentShareObject::BY_COMMENT_SHARER,
                &CommentVoteObject::vote_key(comment_id, &self.sharer),
            )
            .map(|share| (share.id, share.reward));

        match (existing, self.shared) {
            (None, true) => {
                let sharer = db.get_account(&self.sharer)?;
                let sharer_id = sharer.id;
                if now < sharer.last_share_time.saturating_add(MIN_SHARE_INTERVAL) {
                    return Err(BlockchainError::ContentRule("sharing too often"));
                }
                let mana = regenerated_mana(sharer.sharing_mana, sharer.last_share_time, now, SHARE_RECHARGE_TIME);
                let spend = spend_mana(db.voting_stake(sharer), mana, SHARE_RESERVE_RATE, SHARE_RECHARGE_TIME)?;
                if spend.reward <= 0 {
                    return Err(BlockchainError::ContentRule("share carries no stake weight"));
                }

                let store = db.store_mut();
                store.modify::<AccountObject, _>(sharer_id, |account| {
                    account.sharing_mana = spend.mana_left;
                    account.last_share_time = now;
                })?;
                store.modify::<CommentObject, _>(comment_id, |comment| {
                    comment.share_power += spend.reward;
                    comment.share_count += 1;
                })?;
                store.create(CommentShareObject {
                    id: 0,
                    sharer: self.sharer.clone(),
                    comment: comment_id,
                    reward: spend.reward,
                    created: now,
                })?;
                debug!("{} shared {}/{}: {} weight", self.sharer, self.author, self.permlink, spend.reward);
            }
            (Some((share_id, reward)), false) => {
                let store = db.store_mut();
                store.modify::<CommentObject, _>(comment_id, |comment| {
                    comment.share_power -= reward;
                    comment.share_count -= 1;
                })?;
                store.remove::<CommentShareObject>(share_id)?;
                debug!("{} removed the share of {}/{}", self.sharer, self.author, self.permlink);
            }
            (Some(_), true) => return Err(BlockchainError::ContentRule("post already shared")),
            (None, false) => return Err(BlockchainError::ContentRule("no share to remove")),
        }
        Ok(())
    }
}
