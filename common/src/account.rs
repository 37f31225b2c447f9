use crate::{
    config::{
        MAX_ACCOUNT_NAME_LENGTH, MEMBERSHIP_FEE_MID, MEMBERSHIP_FEE_STANDARD, MEMBERSHIP_FEE_TOP,
        MIN_ACCOUNT_NAME_LENGTH, PROXY_TO_SELF_ACCOUNT,
    },
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};
use strum::{Display, EnumIter};

/// Account name, the unique key of an account.
///
/// A name is one or more dot separated segments. Each segment starts with a
/// lowercase letter, ends with a letter or digit, only contains lowercase
/// letters, digits and dashes, and is at least three characters long.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// The proxy value meaning "vote with my own stake".
    pub fn proxy_to_self() -> Self {
        Self(PROXY_TO_SELF_ACCOUNT.to_string())
    }

    pub fn is_proxy_to_self(&self) -> bool {
        self.0 == PROXY_TO_SELF_ACCOUNT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        is_valid_account_name(&self.0)
    }
}

pub fn is_valid_account_name(name: &str) -> bool {
    let len = name.len();
    if !(MIN_ACCOUNT_NAME_LENGTH..=MAX_ACCOUNT_NAME_LENGTH).contains(&len) {
        return false;
    }

    name.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.len() < MIN_ACCOUNT_NAME_LENGTH {
        return false;
    }

    if !bytes[0].is_ascii_lowercase() {
        return false;
    }

    let last = bytes[bytes.len() - 1];
    if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
        return false;
    }

    bytes
        .iter()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AccountName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for AccountName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AccountName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AccountName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serializer for AccountName {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self(reader.read_string()?))
    }

    fn size(&self) -> usize {
        2 + self.0.len()
    }
}

/// Paid membership level of an account.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MembershipTier {
    #[default]
    None,
    Standard,
    Mid,
    Top,
}

impl MembershipTier {
    fn id(&self) -> u8 {
        match self {
            MembershipTier::None => 0,
            MembershipTier::Standard => 1,
            MembershipTier::Mid => 2,
            MembershipTier::Top => 3,
        }
    }

    /// Coin amount charged per membership period.
    pub fn monthly_fee(&self) -> i64 {
        match self {
            MembershipTier::None => 0,
            MembershipTier::Standard => MEMBERSHIP_FEE_STANDARD,
            MembershipTier::Mid => MEMBERSHIP_FEE_MID,
            MembershipTier::Top => MEMBERSHIP_FEE_TOP,
        }
    }
}

impl Serializer for MembershipTier {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            0 => MembershipTier::None,
            1 => MembershipTier::Standard,
            2 => MembershipTier::Mid,
            3 => MembershipTier::Top,
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1
    }
}
