//! Market identification and metadata types.
//!
//! Exchange markets are addressed by a string id joining the base and quote
//! asset symbols, e.g. `xmr_usdt`. Balance lookups need the two asset symbols
//! separately, so the id is validated and split once at construction.

use crate::error::{CoreError, Result};
use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separators accepted between base and quote symbols.
const SEPARATORS: [char; 2] = ['_', '-'];

/// Exchange market identifier (e.g. `xmr_usdt`).
///
/// The id is stored as given (trimmed) because the exchange routes on it
/// verbatim; asset symbols are uppercased for balance lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId {
    id: String,
    base: String,
    quote: String,
}

impl MarketId {
    /// Parse and validate a market id.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        let (base, quote) = id
            .split_once(&SEPARATORS[..])
            .ok_or_else(|| CoreError::InvalidMarketId(format!("{id}: missing separator")))?;

        let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(CoreError::InvalidMarketId(format!(
                "{id}: expected <base>_<quote> with alphanumeric symbols"
            )));
        }

        Ok(Self {
            id: id.to_string(),
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// Market id as sent to the exchange.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Base asset symbol, uppercase (e.g. `XMR`).
    pub fn base_asset(&self) -> &str {
        &self.base
    }

    /// Quote asset symbol, uppercase (e.g. `USDT`).
    pub fn quote_asset(&self) -> &str {
        &self.quote
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl FromStr for MarketId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for MarketId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<MarketId> for String {
    fn from(m: MarketId) -> Self {
        m.id
    }
}

/// Market metadata published by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Minimum order volume in base units.
    pub minimum_trade_volume: Size,
    /// Minimum order price, when the market publishes one.
    #[serde(default)]
    pub minimum_trade_price: Option<Price>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_id_split_underscore() {
        let m = MarketId::new("xmr_usdt").unwrap();
        assert_eq!(m.as_str(), "xmr_usdt");
        assert_eq!(m.base_asset(), "XMR");
        assert_eq!(m.quote_asset(), "USDT");
    }

    #[test]
    fn test_market_id_split_dash() {
        let m = MarketId::new(" BTC-USDT ").unwrap();
        assert_eq!(m.as_str(), "BTC-USDT");
        assert_eq!(m.base_asset(), "BTC");
        assert_eq!(m.quote_asset(), "USDT");
    }

    #[test]
    fn test_market_id_rejects_malformed() {
        assert!(MarketId::new("xmrusdt").is_err());
        assert!(MarketId::new("_usdt").is_err());
        assert!(MarketId::new("xmr_").is_err());
        assert!(MarketId::new("xmr_us dt").is_err());
        assert!(MarketId::new("").is_err());
    }

    #[test]
    fn test_market_id_serde_roundtrip_validates() {
        let m: MarketId = serde_json::from_str(r#""eth_usdt""#).unwrap();
        assert_eq!(m.base_asset(), "ETH");
        assert!(serde_json::from_str::<MarketId>(r#""ethusdt""#).is_err());
    }
}
