use crate::{
    config::{
        BLOCKCHAIN_PRECISION, BLOCKCHAIN_PRECISION_DIGITS, MAX_ASSET_SUPPLY,
        MAX_ASSET_SYMBOL_LENGTH, MIN_ASSET_SYMBOL_LENGTH, SYMBOL_COIN, SYMBOL_CREDIT,
        SYMBOL_EQUITY, SYMBOL_USD,
    },
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};
use strum::{Display, EnumIter};

/// Asset symbol: uppercase letters, digits and dots, starting with a letter.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new<S: Into<String>>(symbol: S) -> Self {
        Self(symbol.into())
    }

    pub fn coin() -> Self {
        Self::new(SYMBOL_COIN)
    }

    pub fn equity() -> Self {
        Self::new(SYMBOL_EQUITY)
    }

    pub fn usd() -> Self {
        Self::new(SYMBOL_USD)
    }

    pub fn credit() -> Self {
        Self::new(SYMBOL_CREDIT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        let bytes = self.0.as_bytes();
        (MIN_ASSET_SYMBOL_LENGTH..=MAX_ASSET_SYMBOL_LENGTH).contains(&bytes.len())
            && bytes[0].is_ascii_uppercase()
            && bytes
                .iter()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == b'.')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serializer for Symbol {
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

/// Kind of asset, decides which per-block processing applies to it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssetType {
    // Plain transferable currency
    Currency,
    // Currency paying interest on liquid, staked and savings balances
    Credit,
    // Ownership share of the network
    Equity,
    // Asset tracking the value of an external currency
    Stablecoin,
}

impl AssetType {
    fn id(&self) -> u8 {
        match self {
            AssetType::Currency => 0,
            AssetType::Credit => 1,
            AssetType::Equity => 2,
            AssetType::Stablecoin => 3,
        }
    }
}

impl Serializer for AssetType {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            0 => AssetType::Currency,
            1 => AssetType::Credit,
            2 => AssetType::Equity,
            3 => AssetType::Stablecoin,
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1
    }
}

/// Amount of an asset in minor units.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new<S: Into<Symbol>>(amount: i64, symbol: S) -> Self {
        Self {
            amount,
            symbol: symbol.into(),
        }
    }

    pub fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn coin(amount: i64) -> Self {
        Self::new(amount, Symbol::coin())
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    // Amount bounded by the maximum supply of any asset
    pub fn is_in_range(&self) -> bool {
        self.amount.abs() <= MAX_ASSET_SUPPLY
    }

    pub fn checked_add(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        Some(Asset {
            amount: self.amount.checked_add(other.amount)?,
            symbol: self.symbol.clone(),
        })
    }

    pub fn checked_sub(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        Some(Asset {
            amount: self.amount.checked_sub(other.amount)?,
            symbol: self.symbol.clone(),
        })
    }

    pub fn negated(&self) -> Asset {
        Asset {
            amount: -self.amount,
            symbol: self.symbol.clone(),
        }
    }

    // Scale the amount by a basis point percentage, rounding down
    pub fn percent(&self, percent: u16) -> Asset {
        let scaled = self.amount as i128 * percent as i128 / crate::config::PERCENT_100 as i128;
        Asset {
            amount: scaled as i64,
            symbol: self.symbol.clone(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let precision = BLOCKCHAIN_PRECISION as u64;
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / precision,
            abs % precision,
            self.symbol,
            width = BLOCKCHAIN_PRECISION_DIGITS as usize
        )
    }
}

impl Serializer for Asset {
    fn write(&self, writer: &mut Writer) {
        writer.write_i64(self.amount);
        self.symbol.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let amount = reader.read_i64()?;
        let symbol = Symbol::read(reader)?;
        Ok(Self { amount, symbol })
    }

    fn size(&self) -> usize {
        8 + self.symbol.size()
    }
}

/// Exchange rate between two assets: `base` is worth `quote`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Self { base, quote }
    }

    pub fn is_valid(&self) -> bool {
        self.base.is_positive()
            && self.quote.is_positive()
            && self.base.symbol != self.quote.symbol
            && self.base.is_in_range()
            && self.quote.is_in_range()
    }

    pub fn inverted(&self) -> Price {
        Price {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Convert an amount of either side into the other side, rounding down.
    pub fn convert(&self, asset: &Asset) -> Option<Asset> {
        let (from, to) = if asset.symbol == self.base.symbol {
            (&self.base, &self.quote)
        } else if asset.symbol == self.quote.symbol {
            (&self.quote, &self.base)
        } else {
            return None;
        };

        let amount = (asset.amount as i128)
            .checked_mul(to.amount as i128)?
            .checked_div(from.amount as i128)?;
        Some(Asset {
            amount: i64::try_from(amount).ok()?,
            symbol: to.symbol.clone(),
        })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl Serializer for Price {
    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        self.quote.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            base: Asset::read(reader)?,
            quote: Asset::read(reader)?,
        })
    }

    fn size(&self) -> usize {
        self.base.size() + self.quote.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_validation() {
        assert!(Symbol::coin().is_valid());
        assert!(Symbol::new("BTC.X").is_valid());
        assert!(!Symbol::new("").is_valid());
        assert!(!Symbol::new("mec").is_valid());
        assert!(!Symbol::new("1ABC").is_valid());
        assert!(!Symbol::new("ABCDEFGHIJK").is_valid());
    }

    #[test]
    fn test_asset_display() {
        assert_eq!(Asset::coin(150_000_000).to_string(), "1.50000000 MEC");
        assert_eq!(Asset::coin(-1).to_string(), "-0.00000001 MEC");
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Asset::coin(10);
        let b = Asset::coin(3);
        assert_eq!(a.checked_sub(&b), Some(Asset::coin(7)));
        assert_eq!(a.checked_add(&Asset::new(1, Symbol::usd())), None);
        assert_eq!(Asset::coin(i64::MAX).checked_add(&b), None);
    }

    #[test]
    fn test_price_convert() {
        // 2 MEC buys 1 MUSD
        let price = Price::new(Asset::coin(2), Asset::new(1, Symbol::usd()));
        assert_eq!(
            price.convert(&Asset::coin(10)),
            Some(Asset::new(5, Symbol::usd()))
        );
        assert_eq!(
            price.convert(&Asset::new(5, Symbol::usd())),
            Some(Asset::coin(10))
        );
        assert_eq!(price.convert(&Asset::new(5, Symbol::credit())), None);
    }

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(Asset::coin(999).percent(1000), Asset::coin(99));
    }
}
