use super::{
    validate_account_name, validate_json, validate_length, validate_non_negative,
    validate_percent, OperationType,
};
use crate::{
    account::AccountName,
    asset::{Asset, Symbol},
    authority::{AuthorityLevel, RequiredAuthorities},
    config::{
        MAX_BODY_SIZE, MAX_COMMENT_BENEFICIARIES, MAX_PERMLINK_LENGTH, MAX_STRING_SIZE,
        PERCENT_100,
    },
    error::ValidationError,
    reward::RewardCurve,
};
use serde::{Deserialize, Serialize};

pub fn is_valid_permlink(permlink: &str) -> bool {
    !permlink.is_empty()
        && permlink.len() <= MAX_PERMLINK_LENGTH
        && permlink
            .bytes()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == b'-')
}

fn validate_permlink(field: &'static str, permlink: &str) -> Result<(), ValidationError> {
    if permlink.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    validate_length(field, permlink, MAX_PERMLINK_LENGTH)?;
    if !is_valid_permlink(permlink) {
        return Err(ValidationError::InvalidParameters("permlink has invalid characters"));
    }
    Ok(())
}

/// Create or edit a post, or a reply when `parent_author` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOperation {
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: AccountName,
    pub parent_permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

impl_serializer!(CommentOperation {
    author,
    permlink,
    parent_author,
    parent_permlink,
    title,
    body,
    json_metadata
});

impl CommentOperation {
    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }
}

impl OperationType for CommentOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.author)?;
        validate_permlink("permlink", &self.permlink)?;
        if !self.is_root() {
            validate_account_name(&self.parent_author)?;
        }
        validate_permlink("parent_permlink", &self.parent_permlink)?;
        validate_length("title", &self.title, MAX_STRING_SIZE)?;
        if self.body.is_empty() {
            return Err(ValidationError::Empty("body"));
        }
        validate_length("body", &self.body, MAX_BODY_SIZE)?;
        validate_json("json_metadata", &self.json_metadata)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.author, AuthorityLevel::Posting);
    }
}

/// Account receiving a share of the author reward.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeneficiaryRoute {
    pub account: AccountName,
    pub weight: u16,
}

impl_serializer!(BeneficiaryRoute { account, weight });

/// Reward settings of a comment, only editable before it receives votes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOptionsOperation {
    pub author: AccountName,
    pub permlink: String,
    pub max_accepted_payout: Asset,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub reward_curve: RewardCurve,
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

impl_serializer!(CommentOptionsOperation {
    author,
    permlink,
    max_accepted_payout,
    allow_votes,
    allow_curation_rewards,
    reward_curve,
    beneficiaries
});

impl OperationType for CommentOptionsOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.author)?;
        validate_permlink("permlink", &self.permlink)?;
        validate_non_negative(&self.max_accepted_payout)?;
        if self.max_accepted_payout.symbol != Symbol::coin() {
            return Err(ValidationError::SymbolMismatch {
                expected: Symbol::coin(),
                found: self.max_accepted_payout.symbol.clone(),
            });
        }

        if self.beneficiaries.len() > MAX_COMMENT_BENEFICIARIES {
            return Err(ValidationError::InvalidParameters("too many beneficiaries"));
        }

        let mut total: u32 = 0;
        for (i, route) in self.beneficiaries.iter().enumerate() {
            validate_account_name(&route.account)?;
            validate_percent(route.weight)?;
            if route.account == self.author {
                return Err(ValidationError::SelfReference(self.author.clone()));
            }
            if let Some(previous) = i.checked_sub(1).map(|p| &self.beneficiaries[p]) {
                if previous.account == route.account {
                    return Err(ValidationError::Duplicate(route.account.to_string()));
                }
                if previous.account > route.account {
                    return Err(ValidationError::NotSorted("beneficiaries"));
                }
            }
            total += route.weight as u32;
        }

        if total > PERCENT_100 as u32 {
            return Err(ValidationError::InvalidParameters(
                "beneficiary weights exceed 100%",
            ));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.author, AuthorityLevel::Posting);
    }
}

/// Vote on a comment with a signed weight in basis points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub weight: i16,
}

impl_serializer!(VoteOperation {
    voter,
    author,
    permlink,
    weight
});

impl OperationType for VoteOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.voter)?;
        validate_account_name(&self.author)?;
        validate_permlink("permlink", &self.permlink)?;
        if self.weight.unsigned_abs() > PERCENT_100 {
            return Err(ValidationError::InvalidPercent(self.weight.unsigned_abs()));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.voter, AuthorityLevel::Posting);
    }
}

/// Record or withdraw a view of a comment, spending viewing mana.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOperation {
    pub viewer: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub viewed: bool,
}

impl_serializer!(ViewOperation {
    viewer,
    author,
    permlink,
    viewed
});

impl OperationType for ViewOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.viewer)?;
        validate_account_name(&self.author)?;
        validate_permlink("permlink", &self.permlink)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.viewer, AuthorityLevel::Posting);
    }
}

/// Share a root post with the sharer's followers, spending sharing mana.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareOperation {
    pub sharer: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub shared: bool,
}

impl_serializer!(ShareOperation {
    sharer,
    author,
    permlink,
    shared
});

impl OperationType for ShareOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.sharer)?;
        validate_account_name(&self.author)?;
        validate_permlink("permlink", &self.permlink)?;
        if self.sharer == self.author {
            return Err(ValidationError::SelfReference(self.sharer.clone()));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.sharer, AuthorityLevel::Posting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(beneficiaries: Vec<BeneficiaryRoute>) -> CommentOptionsOperation {
        CommentOptionsOperation {
            author: "alice".into(),
            permlink: "hello-world".into(),
            max_accepted_payout: Asset::coin(1_000_000),
            allow_votes: true,
            allow_curation_rewards: true,
            reward_curve: RewardCurve::default(),
            beneficiaries,
        }
    }

    fn route(account: &str, weight: u16) -> BeneficiaryRoute {
        BeneficiaryRoute {
            account: account.into(),
            weight,
        }
    }

    #[test]
    fn test_beneficiaries_sorted_and_unique() {
        assert!(options(vec![route("bob", 1000), route("carol", 2000)]).validate().is_ok());
        assert_eq!(
            options(vec![route("carol", 1000), route("bob", 2000)]).validate(),
            Err(ValidationError::NotSorted("beneficiaries"))
        );
        assert!(matches!(
            options(vec![route("bob", 1000), route("bob", 2000)]).validate(),
            Err(ValidationError::Duplicate(_))
        ));
    }

    #[test]
    fn test_beneficiaries_total_bounded() {
        assert!(options(vec![route("bob", 6000), route("carol", 5000)]).validate().is_err());
        assert!(options(vec![route("bob", 6000), route("carol", 4000)]).validate().is_ok());
    }

    #[test]
    fn test_vote_weight_bounds() {
        let mut vote = VoteOperation {
            voter: "bob".into(),
            author: "alice".into(),
            permlink: "hello-world".into(),
            weight: -10_000,
        };
        assert!(vote.validate().is_ok());
        vote.weight = 10_001;
        assert!(vote.validate().is_err());
    }

    #[test]
    fn test_share_of_own_post_rejected() {
        let mut share = ShareOperation {
            sharer: "bob".into(),
            author: "alice".into(),
            permlink: "hello-world".into(),
            shared: true,
        };
        assert!(share.validate().is_ok());
        share.sharer = "alice".into();
        assert!(matches!(share.validate(), Err(ValidationError::SelfReference(_))));
    }

    #[test]
    fn test_permlink_characters() {
        assert!(is_valid_permlink("my-first-post-1"));
        assert!(!is_valid_permlink("My Post"));
        assert!(!is_valid_permlink(""));
    }
}
