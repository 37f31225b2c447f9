use super::{validate_account_name, validate_length, OperationType};
use crate::{
    account::AccountName,
    authority::{AuthorityLevel, RequiredAuthorities},
    config::MAX_URL_SIZE,
    crypto::PublicKey,
    error::ValidationError,
};
use serde::{Deserialize, Serialize};

/// Register or update a block producer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerUpdateOperation {
    pub owner: AccountName,
    pub signing_key: PublicKey,
    pub url: String,
    pub active: bool,
}

impl_serializer!(ProducerUpdateOperation {
    owner,
    signing_key,
    url,
    active
});

impl OperationType for ProducerUpdateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.owner)?;
        validate_length("url", &self.url, MAX_URL_SIZE)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.owner, AuthorityLevel::Active);
    }
}
